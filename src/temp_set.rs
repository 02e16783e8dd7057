use hashbrown::HashSet;

/// Reused scratch set of attribute names seen on the current tag.
#[derive(Debug, Default)]
pub struct TempKeySet(HashSet<String>);
impl TempKeySet {
	pub fn new() -> Self {
		Self(HashSet::new())
	}

	/// Clears the set and lends it out, so keys from an aborted diff never carry over.
	pub fn temp(&mut self) -> &mut HashSet<String> {
		self.0.clear();
		&mut self.0
	}

	/// Retrieves the set's capacity without clearing it first.
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}

//! Live subscriptions and registrations, keyed by router-assigned id.

use std::collections::HashMap;

use wamp_protocol::Id;

pub(crate) struct HandleRegistry<H> {
	handles: HashMap<Id, H>,
}

impl<H> HandleRegistry<H> {
	pub fn new() -> Self {
		Self { handles: HashMap::new() }
	}

	/// Adds `handle`, returning whatever was registered under `id` before.
	pub fn register(&mut self, id: Id, handle: H) -> Option<H> {
		self.handles.insert(id, handle)
	}

	pub fn lookup(&self, id: Id) -> Option<&H> {
		self.handles.get(&id)
	}

	pub fn remove(&mut self, id: Id) -> Option<H> {
		self.handles.remove(&id)
	}

	pub fn contains(&self, id: Id) -> bool {
		self.handles.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.handles.len()
	}

	pub fn drain(&mut self) -> impl Iterator<Item = H> + '_ {
		self.handles.drain().map(|(_, handle)| handle)
	}
}

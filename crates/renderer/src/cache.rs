//! Shared program registry.
//!
//! Each material variant links its programs once and every instance of that variant
//! shares them. The cache is an ordinary value owned by whoever owns the GPU context,
//! so losing the context means calling [`ProgramCache::clear`] and relinking.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::shader::{LinkError, ShaderProgram};

/// Identity of a cached program, e.g. `"vertex_light.forward_add"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramKey(pub &'static str);

#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: Mutex<HashMap<ProgramKey, Arc<ShaderProgram>>>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached program for `key`, linking it with `link` on first use.
    /// A failed link is not cached.
    pub fn get_or_link(
        &self,
        key: ProgramKey,
        link: impl FnOnce() -> Result<ShaderProgram, LinkError>,
    ) -> Result<Arc<ShaderProgram>, LinkError> {
        if let Some(program) = self.get(key) {
            return Ok(program);
        }
        // Link without holding the lock; the first insert wins.
        let program = Arc::new(link()?);
        log::info!("program cache: linked {:?}", key.0);
        Ok(self.programs.lock().entry(key).or_insert(program).clone())
    }

    pub fn get(&self, key: ProgramKey) -> Option<Arc<ShaderProgram>> {
        self.programs.lock().get(&key).cloned()
    }

    /// Drop one program; the next request relinks it.
    pub fn invalidate(&self, key: ProgramKey) -> bool {
        self.programs.lock().remove(&key).is_some()
    }

    /// Drop everything, e.g. after the graphics context was lost.
    pub fn clear(&self) -> usize {
        let mut programs = self.programs.lock();
        let n = programs.len();
        programs.clear();
        log::info!("program cache: cleared {} programs", n);
        n
    }

    pub fn len(&self) -> usize {
        self.programs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

pub type HandleId = u64;

/// Type-safe resource handle.
///
/// We manually implement Hash, Eq, PartialEq, Clone, Copy to avoid adding bounds on T.
/// The derive macros would add `T: Hash`, `T: Eq`, `T: Clone`, `T: Copy` etc. even though
/// we only hash/compare/copy the `id` field.
#[derive(Debug)]
pub struct Handle<T> {
    id: HandleId,
    _phantom: PhantomData<fn(T) -> T>,
}

// Manual implementations without bounds on T
impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T: ResourceType> Handle<T> {
    /// Creates a new handle with a unique ID generated internally.
    /// This is the safe public constructor that prevents ID collisions.
    pub fn next() -> Self {
        Self {
            id: next_handle_id(),
            _phantom: PhantomData,
        }
    }

    /// Get the handle's unique ID
    pub fn id(&self) -> HandleId {
        self.id
    }
}

/// Handle ID generator
static HANDLE_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_handle_id() -> HandleId {
    HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Resource type marker trait
pub trait ResourceType: 'static {}

impl ResourceType for wgpu::Buffer {}
impl ResourceType for wgpu::Texture {}
impl ResourceType for wgpu::TextureView {}
impl ResourceType for wgpu::Sampler {}
impl ResourceType for wgpu::BindGroupLayout {}
impl ResourceType for wgpu::BindGroup {}
impl ResourceType for wgpu::RenderPipeline {}
impl ResourceType for wgpu::ShaderModule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_with_different_ids_are_not_equal() {
        let a = Handle::<wgpu::Buffer>::next();
        let b = Handle::<wgpu::Buffer>::next();
        assert_ne!(a, b);
    }

    #[test]
    fn handle_is_copy() {
        let a = Handle::<wgpu::Buffer>::next();
        let b = a;
        assert_eq!(a, b);
    }
}

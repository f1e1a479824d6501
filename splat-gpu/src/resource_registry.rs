use crate::handle::Handle;
use std::collections::HashMap;

/// Registry mapping handles to actual wgpu resources.
/// Provides type-safe resource lookup and management.
pub struct ResourceRegistry {
    buffers: HashMap<u64, wgpu::Buffer>,
    textures: HashMap<u64, wgpu::Texture>,
    texture_views: HashMap<u64, wgpu::TextureView>,
    samplers: HashMap<u64, wgpu::Sampler>,
    bind_group_layouts: HashMap<u64, wgpu::BindGroupLayout>,
    bind_groups: HashMap<u64, wgpu::BindGroup>,
    render_pipelines: HashMap<u64, wgpu::RenderPipeline>,
    shader_modules: HashMap<u64, wgpu::ShaderModule>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            textures: HashMap::new(),
            texture_views: HashMap::new(),
            samplers: HashMap::new(),
            bind_group_layouts: HashMap::new(),
            bind_groups: HashMap::new(),
            render_pipelines: HashMap::new(),
            shader_modules: HashMap::new(),
        }
    }

    /// Register a buffer resource. If a buffer with the same handle ID
    /// already exists, it is silently replaced and the old buffer dropped.
    pub fn register_buffer(&mut self, handle: Handle<wgpu::Buffer>, buffer: wgpu::Buffer) {
        self.buffers.insert(handle.id(), buffer);
    }

    pub fn get_buffer(&self, handle: Handle<wgpu::Buffer>) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle.id())
    }

    pub fn remove_buffer(&mut self, handle: Handle<wgpu::Buffer>) -> Option<wgpu::Buffer> {
        self.buffers.remove(&handle.id())
    }

    pub fn register_texture(&mut self, handle: Handle<wgpu::Texture>, texture: wgpu::Texture) {
        self.textures.insert(handle.id(), texture);
    }

    pub fn get_texture(&self, handle: Handle<wgpu::Texture>) -> Option<&wgpu::Texture> {
        self.textures.get(&handle.id())
    }

    pub fn remove_texture(&mut self, handle: Handle<wgpu::Texture>) -> Option<wgpu::Texture> {
        self.textures.remove(&handle.id())
    }

    pub fn register_sampler(&mut self, handle: Handle<wgpu::Sampler>, sampler: wgpu::Sampler) {
        self.samplers.insert(handle.id(), sampler);
    }

    pub fn get_sampler(&self, handle: Handle<wgpu::Sampler>) -> Option<&wgpu::Sampler> {
        self.samplers.get(&handle.id())
    }

    pub fn remove_sampler(&mut self, handle: Handle<wgpu::Sampler>) -> Option<wgpu::Sampler> {
        self.samplers.remove(&handle.id())
    }

    pub fn register_bind_group(
        &mut self,
        handle: Handle<wgpu::BindGroup>,
        bind_group: wgpu::BindGroup,
    ) {
        self.bind_groups.insert(handle.id(), bind_group);
    }

    pub fn get_bind_group(&self, handle: Handle<wgpu::BindGroup>) -> Option<&wgpu::BindGroup> {
        self.bind_groups.get(&handle.id())
    }

    pub fn remove_bind_group(
        &mut self,
        handle: Handle<wgpu::BindGroup>,
    ) -> Option<wgpu::BindGroup> {
        self.bind_groups.remove(&handle.id())
    }

    pub fn register_render_pipeline(
        &mut self,
        handle: Handle<wgpu::RenderPipeline>,
        pipeline: wgpu::RenderPipeline,
    ) {
        self.render_pipelines.insert(handle.id(), pipeline);
    }

    pub fn get_render_pipeline(
        &self,
        handle: Handle<wgpu::RenderPipeline>,
    ) -> Option<&wgpu::RenderPipeline> {
        self.render_pipelines.get(&handle.id())
    }

    pub fn remove_render_pipeline(
        &mut self,
        handle: Handle<wgpu::RenderPipeline>,
    ) -> Option<wgpu::RenderPipeline> {
        self.render_pipelines.remove(&handle.id())
    }

    pub fn register_shader_module(
        &mut self,
        handle: Handle<wgpu::ShaderModule>,
        shader: wgpu::ShaderModule,
    ) {
        self.shader_modules.insert(handle.id(), shader);
    }

    pub fn get_shader_module(
        &self,
        handle: Handle<wgpu::ShaderModule>,
    ) -> Option<&wgpu::ShaderModule> {
        self.shader_modules.get(&handle.id())
    }

    pub fn remove_shader_module(
        &mut self,
        handle: Handle<wgpu::ShaderModule>,
    ) -> Option<wgpu::ShaderModule> {
        self.shader_modules.remove(&handle.id())
    }

    /// Remove a resource by ID, checking all resource types.
    /// Returns true if a resource was found and removed.
    pub fn remove_by_id(&mut self, id: u64) -> bool {
        self.buffers.remove(&id).is_some()
            || self.textures.remove(&id).is_some()
            || self.texture_views.remove(&id).is_some()
            || self.samplers.remove(&id).is_some()
            || self.bind_group_layouts.remove(&id).is_some()
            || self.bind_groups.remove(&id).is_some()
            || self.render_pipelines.remove(&id).is_some()
            || self.shader_modules.remove(&id).is_some()
    }

    /// Clear all resources, dropping their GPU memory. Useful for teardown
    /// or a scene reload.
    pub fn clear_all(&mut self) {
        self.buffers.clear();
        self.textures.clear();
        self.texture_views.clear();
        self.samplers.clear();
        self.bind_group_layouts.clear();
        self.bind_groups.clear();
        self.render_pipelines.clear();
        self.shader_modules.clear();
    }

    pub fn resource_count(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.texture_views.len()
            + self.samplers.len()
            + self.bind_group_layouts.len()
            + self.bind_groups.len()
            + self.render_pipelines.len()
            + self.shader_modules.len()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridges a wgpu resource type to its backing map in the registry, so
/// callers can `registry.insert(x)` / `registry.get(handle)` without naming
/// the resource-specific method. Every builder in this crate (`BufferBuilder`,
/// `BindGroupBuilder`, `RenderPipelineBuilder`) is written against this
/// generic surface rather than the typed `register_X`/`get_X` methods above.
pub trait StorableResource: ResourceType + Sized {
    fn map(registry: &mut ResourceRegistry) -> &mut HashMap<u64, Self>;
    fn map_ref(registry: &ResourceRegistry) -> &HashMap<u64, Self>;
}

use crate::handle::ResourceType;

macro_rules! storable {
    ($ty:ty, $field:ident) => {
        impl StorableResource for $ty {
            fn map(registry: &mut ResourceRegistry) -> &mut HashMap<u64, Self> {
                &mut registry.$field
            }
            fn map_ref(registry: &ResourceRegistry) -> &HashMap<u64, Self> {
                &registry.$field
            }
        }
    };
}

storable!(wgpu::Buffer, buffers);
storable!(wgpu::Texture, textures);
storable!(wgpu::TextureView, texture_views);
storable!(wgpu::Sampler, samplers);
storable!(wgpu::BindGroupLayout, bind_group_layouts);
storable!(wgpu::BindGroup, bind_groups);
storable!(wgpu::RenderPipeline, render_pipelines);
storable!(wgpu::ShaderModule, shader_modules);

impl ResourceRegistry {
    /// Insert a resource, generating a fresh handle for it.
    pub fn insert<T: StorableResource>(&mut self, resource: T) -> Handle<T> {
        let handle = Handle::next();
        T::map(self).insert(handle.id(), resource);
        handle
    }

    /// Look up a resource by handle.
    pub fn get<T: StorableResource>(&self, handle: Handle<T>) -> Option<&T> {
        T::map_ref(self).get(&handle.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_is_empty() {
        let registry = ResourceRegistry::new();
        assert_eq!(registry.resource_count(), 0);
    }

    #[test]
    fn remove_by_id_on_empty_registry_is_false() {
        let mut registry = ResourceRegistry::new();
        assert!(!registry.remove_by_id(42));
    }
}

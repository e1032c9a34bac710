use crate::{
	callbacks_ptr,
	function_table::{DeviceFunctions, InstanceFunctions},
	lazy_function::LazyFunction,
	AllocationCallbacks,
};
use ash::vk::{self, Handle};
use log::debug;
use std::{fmt, mem};

/// Something child objects are created from and destroyed through, i.e. an instance or a device.
pub trait Owner {
	type Raw: Handle + Copy + fmt::Debug;
	type Functions;

	fn raw(&self) -> Self::Raw;
	fn functions(&self) -> &Self::Functions;
}

pub type DestroyFunction<O, T> = LazyFunction<unsafe extern "system" fn(O, T, *const vk::AllocationCallbacks), O>;

/// Describes one kind of child object: its handle, what owns it and which slot destroys it.
pub trait SubObjectTraits {
	type Raw: Handle + Copy + fmt::Debug;
	type Owner: Handle + Copy + fmt::Debug;
	type Functions: 'static;

	fn destruction_function(functions: &Self::Functions) -> &DestroyFunction<Self::Owner, Self::Raw>;
}

/// Owns a child handle and destroys it through its owner exactly once.
///
/// The owner is borrowed for as long as the wrapper lives, so it can't be destroyed first.
pub struct SubObject<'a, T: SubObjectTraits> {
	vk: T::Raw,
	owner: T::Owner,
	destroy: &'a DestroyFunction<T::Owner, T::Raw>,
	allocator: Option<AllocationCallbacks>,
}
impl<'a, T: SubObjectTraits> SubObject<'a, T> {
	pub fn new<O>(raw: T::Raw, allocator: Option<&vk::AllocationCallbacks>, owner: &'a O) -> Self
	where
		O: Owner<Raw = T::Owner, Functions = T::Functions>,
	{
		Self {
			vk: raw,
			owner: owner.raw(),
			destroy: T::destruction_function(owner.functions()),
			allocator: AllocationCallbacks::copied(allocator),
		}
	}

	/// An empty wrapper, to be filled later with `initialize`.
	pub fn null<O>(owner: &'a O) -> Self
	where
		O: Owner<Raw = T::Owner, Functions = T::Functions>,
	{
		Self::new(T::Raw::from_raw(0), None, owner)
	}

	pub fn raw(&self) -> T::Raw {
		self.vk
	}

	pub fn owner(&self) -> T::Owner {
		self.owner
	}

	pub fn allocation_callbacks(&self) -> Option<&vk::AllocationCallbacks> {
		self.allocator.as_ref().map(|callbacks| &callbacks.0)
	}

	pub fn is_null(&self) -> bool {
		self.vk.as_raw() == 0
	}

	/// Moves the handle into a new wrapper and leaves this one empty.
	pub fn take(&mut self) -> Self {
		Self {
			vk: mem::replace(&mut self.vk, T::Raw::from_raw(0)),
			owner: self.owner,
			destroy: self.destroy,
			allocator: self.allocator,
		}
	}

	/// Gives up ownership without destroying anything.
	pub fn into_raw(mut self) -> T::Raw {
		mem::replace(&mut self.vk, T::Raw::from_raw(0))
	}

	/// Adopts `raw` into an empty wrapper, with the allocation callbacks it was created with.
	pub fn initialize(&mut self, raw: T::Raw, allocator: Option<&vk::AllocationCallbacks>) {
		assert!(self.is_null(), "{:?} would be leaked by adopting {:?}", self.vk, raw);
		self.vk = raw;
		self.allocator = AllocationCallbacks::copied(allocator);
	}

	/// Destroys the handle now. The wrapper is left empty, so calling this again does nothing.
	pub fn destroy(&mut self) {
		if self.is_null() {
			return;
		}

		debug!("destroying {:?} owned by {:?}", self.vk, self.owner);
		unsafe { (self.destroy)(self.owner, self.vk, callbacks_ptr(&self.allocator)) };
		self.vk = T::Raw::from_raw(0);
	}
}
impl<'a, T: SubObjectTraits> Drop for SubObject<'a, T> {
	fn drop(&mut self) {
		self.destroy();
	}
}
impl<'a, T: SubObjectTraits> fmt::Debug for SubObject<'a, T> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("SubObject").field("vk", &self.vk).field("owner", &self.owner).finish()
	}
}

macro_rules! sub_object {
	($($alias:ident($traits:ident): $raw:ty, $owner:ty, $functions:ty => $destroy:ident;)*) => {
		$(
			pub enum $traits {}
			impl SubObjectTraits for $traits {
				type Raw = $raw;
				type Owner = $owner;
				type Functions = $functions;

				fn destruction_function(functions: &$functions) -> &DestroyFunction<$owner, $raw> {
					&functions.$destroy
				}
			}
			pub type $alias<'a> = SubObject<'a, $traits>;
		)*
	};
}

sub_object! {
	Surface(SurfaceTraits): vk::SurfaceKHR, vk::Instance, InstanceFunctions => destroy_surface_khr;
	CommandPool(CommandPoolTraits): vk::CommandPool, vk::Device, DeviceFunctions => destroy_command_pool;
	DescriptorPool(DescriptorPoolTraits): vk::DescriptorPool, vk::Device, DeviceFunctions => destroy_descriptor_pool;
	DescriptorSetLayout(DescriptorSetLayoutTraits):
		vk::DescriptorSetLayout, vk::Device, DeviceFunctions => destroy_descriptor_set_layout;
	Image(ImageTraits): vk::Image, vk::Device, DeviceFunctions => destroy_image;
	ImageView(ImageViewTraits): vk::ImageView, vk::Device, DeviceFunctions => destroy_image_view;
	Sampler(SamplerTraits): vk::Sampler, vk::Device, DeviceFunctions => destroy_sampler;
	Fence(FenceTraits): vk::Fence, vk::Device, DeviceFunctions => destroy_fence;
	Event(EventTraits): vk::Event, vk::Device, DeviceFunctions => destroy_event;
	Semaphore(SemaphoreTraits): vk::Semaphore, vk::Device, DeviceFunctions => destroy_semaphore;
	RenderPass(RenderPassTraits): vk::RenderPass, vk::Device, DeviceFunctions => destroy_render_pass;
	Framebuffer(FramebufferTraits): vk::Framebuffer, vk::Device, DeviceFunctions => destroy_framebuffer;
	PipelineCache(PipelineCacheTraits): vk::PipelineCache, vk::Device, DeviceFunctions => destroy_pipeline_cache;
	PipelineLayout(PipelineLayoutTraits): vk::PipelineLayout, vk::Device, DeviceFunctions => destroy_pipeline_layout;
	Pipeline(PipelineTraits): vk::Pipeline, vk::Device, DeviceFunctions => destroy_pipeline;
	DeviceMemory(DeviceMemoryTraits): vk::DeviceMemory, vk::Device, DeviceFunctions => free_memory;
	ShaderModule(ShaderModuleTraits): vk::ShaderModule, vk::Device, DeviceFunctions => destroy_shader_module;
	Buffer(BufferTraits): vk::Buffer, vk::Device, DeviceFunctions => destroy_buffer;
	BufferView(BufferViewTraits): vk::BufferView, vk::Device, DeviceFunctions => destroy_buffer_view;
	QueryPool(QueryPoolTraits): vk::QueryPool, vk::Device, DeviceFunctions => destroy_query_pool;
}

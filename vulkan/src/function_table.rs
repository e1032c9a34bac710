use crate::lazy_function::{LazyFunction, Resolver};
use ash::vk;
use std::{ffi::CStr, sync::Arc};

/// Turns `"PFN_vkCreateDevice\0"` into `vkCreateDevice`.
fn entry_point_name(pfn: &'static str) -> &'static CStr {
	let name = pfn.strip_prefix("PFN_").unwrap_or(pfn);
	// the only nul is the one concat! appends
	unsafe { CStr::from_bytes_with_nul_unchecked(name.as_bytes()) }
}

/// Declares a table of lazily resolved entry points that all share one owner handle and one resolver.
///
/// Every field is named after its entry point, so `destroy_fence: PFN_vkDestroyFence` resolves `vkDestroyFence`.
/// Tables listed under `nested` are built from the same handle and resolver.
macro_rules! function_table {
	(
		$(#[$meta:meta])*
		pub struct $name:ident for $handle:ty {
			$($(#[$field_meta:meta])* $field:ident: $pfn:ident,)*
		}
		$(nested {
			$($nested:ident: $nested_ty:ty,)*
		})?
	) => {
		$(#[$meta])*
		pub struct $name {
			$($(pub $nested: $nested_ty,)*)?
			$($(#[$field_meta])* pub $field: LazyFunction<vk::$pfn, $handle>,)*
		}
		impl $name {
			pub fn new(handle: $handle, resolver: Arc<dyn Resolver<$handle>>) -> Self {
				Self {
					$($($nested: <$nested_ty>::new(handle, resolver.clone()),)*)?
					$(
						$(#[$field_meta])*
						$field: LazyFunction::new(
							handle,
							entry_point_name(concat!(stringify!($pfn), "\0")),
							resolver.clone(),
						),
					)*
				}
			}
		}
	};
}

function_table! {
	/// Entry points that exist before any instance, resolved against the null instance.
	pub struct LibraryFunctions for vk::Instance {
		create_instance: PFN_vkCreateInstance,
		enumerate_instance_extension_properties: PFN_vkEnumerateInstanceExtensionProperties,
		enumerate_instance_layer_properties: PFN_vkEnumerateInstanceLayerProperties,
		enumerate_instance_version: PFN_vkEnumerateInstanceVersion,
	}
}

function_table! {
	pub struct InstanceFunctions for vk::Instance {
		destroy_instance: PFN_vkDestroyInstance,
		get_device_proc_addr: PFN_vkGetDeviceProcAddr,
		enumerate_physical_devices: PFN_vkEnumeratePhysicalDevices,
		enumerate_physical_device_groups: PFN_vkEnumeratePhysicalDeviceGroups,
		create_device: PFN_vkCreateDevice,
		enumerate_device_extension_properties: PFN_vkEnumerateDeviceExtensionProperties,
		enumerate_device_layer_properties: PFN_vkEnumerateDeviceLayerProperties,
		get_physical_device_features: PFN_vkGetPhysicalDeviceFeatures,
		get_physical_device_memory_properties: PFN_vkGetPhysicalDeviceMemoryProperties,
		get_physical_device_properties: PFN_vkGetPhysicalDeviceProperties,
		get_physical_device_queue_family_properties: PFN_vkGetPhysicalDeviceQueueFamilyProperties,
		get_physical_device_format_properties: PFN_vkGetPhysicalDeviceFormatProperties,
		get_physical_device_image_format_properties: PFN_vkGetPhysicalDeviceImageFormatProperties,
		get_physical_device_sparse_image_format_properties: PFN_vkGetPhysicalDeviceSparseImageFormatProperties,
		destroy_surface_khr: PFN_vkDestroySurfaceKHR,
		get_physical_device_surface_support_khr: PFN_vkGetPhysicalDeviceSurfaceSupportKHR,
		get_physical_device_surface_capabilities_khr: PFN_vkGetPhysicalDeviceSurfaceCapabilitiesKHR,
		get_physical_device_surface_formats_khr: PFN_vkGetPhysicalDeviceSurfaceFormatsKHR,
		get_physical_device_surface_present_modes_khr: PFN_vkGetPhysicalDeviceSurfacePresentModesKHR,
		#[cfg(target_os = "android")]
		create_android_surface_khr: PFN_vkCreateAndroidSurfaceKHR,
		#[cfg(all(unix, not(target_os = "android"), not(target_os = "macos")))]
		create_xcb_surface_khr: PFN_vkCreateXcbSurfaceKHR,
		#[cfg(windows)]
		create_win32_surface_khr: PFN_vkCreateWin32SurfaceKHR,
	}
}

function_table! {
	/// Recording entry points. They're device level, so they resolve through the device that owns the pool.
	pub struct CommandBufferFunctions for vk::Device {
		begin_command_buffer: PFN_vkBeginCommandBuffer,
		end_command_buffer: PFN_vkEndCommandBuffer,
		reset_command_buffer: PFN_vkResetCommandBuffer,
		cmd_pipeline_barrier: PFN_vkCmdPipelineBarrier,
		cmd_copy_buffer_to_image: PFN_vkCmdCopyBufferToImage,
		cmd_copy_image_to_buffer: PFN_vkCmdCopyImageToBuffer,
		cmd_begin_render_pass: PFN_vkCmdBeginRenderPass,
		cmd_end_render_pass: PFN_vkCmdEndRenderPass,
		cmd_next_subpass: PFN_vkCmdNextSubpass,
		cmd_bind_pipeline: PFN_vkCmdBindPipeline,
		cmd_set_line_width: PFN_vkCmdSetLineWidth,
		cmd_set_blend_constants: PFN_vkCmdSetBlendConstants,
		cmd_set_depth_bias: PFN_vkCmdSetDepthBias,
		cmd_set_depth_bounds: PFN_vkCmdSetDepthBounds,
		cmd_set_stencil_compare_mask: PFN_vkCmdSetStencilCompareMask,
		cmd_set_stencil_write_mask: PFN_vkCmdSetStencilWriteMask,
		cmd_set_stencil_reference: PFN_vkCmdSetStencilReference,
		cmd_set_scissor: PFN_vkCmdSetScissor,
		cmd_set_viewport: PFN_vkCmdSetViewport,
		cmd_set_device_mask: PFN_vkCmdSetDeviceMask,
		cmd_copy_buffer: PFN_vkCmdCopyBuffer,
		cmd_bind_descriptor_sets: PFN_vkCmdBindDescriptorSets,
		cmd_bind_vertex_buffers: PFN_vkCmdBindVertexBuffers,
		cmd_clear_color_image: PFN_vkCmdClearColorImage,
		cmd_clear_depth_stencil_image: PFN_vkCmdClearDepthStencilImage,
		cmd_bind_index_buffer: PFN_vkCmdBindIndexBuffer,
		cmd_draw: PFN_vkCmdDraw,
		cmd_draw_indexed: PFN_vkCmdDrawIndexed,
		cmd_draw_indirect: PFN_vkCmdDrawIndirect,
		cmd_draw_indexed_indirect: PFN_vkCmdDrawIndexedIndirect,
		cmd_dispatch: PFN_vkCmdDispatch,
		cmd_dispatch_base: PFN_vkCmdDispatchBase,
		cmd_dispatch_indirect: PFN_vkCmdDispatchIndirect,
		cmd_blit_image: PFN_vkCmdBlitImage,
		cmd_push_constants: PFN_vkCmdPushConstants,
		cmd_execute_commands: PFN_vkCmdExecuteCommands,
		cmd_resolve_image: PFN_vkCmdResolveImage,
		cmd_copy_image: PFN_vkCmdCopyImage,
		cmd_clear_attachments: PFN_vkCmdClearAttachments,
		cmd_update_buffer: PFN_vkCmdUpdateBuffer,
		cmd_fill_buffer: PFN_vkCmdFillBuffer,
		cmd_reset_query_pool: PFN_vkCmdResetQueryPool,
		cmd_begin_query: PFN_vkCmdBeginQuery,
		cmd_end_query: PFN_vkCmdEndQuery,
		cmd_write_timestamp: PFN_vkCmdWriteTimestamp,
		cmd_copy_query_pool_results: PFN_vkCmdCopyQueryPoolResults,
		cmd_set_event: PFN_vkCmdSetEvent,
		cmd_reset_event: PFN_vkCmdResetEvent,
		cmd_wait_events: PFN_vkCmdWaitEvents,
	}
}

function_table! {
	pub struct QueueFunctions for vk::Device {
		queue_submit: PFN_vkQueueSubmit,
		queue_wait_idle: PFN_vkQueueWaitIdle,
		queue_bind_sparse: PFN_vkQueueBindSparse,
		queue_present_khr: PFN_vkQueuePresentKHR,
	}
}

function_table! {
	pub struct DeviceFunctions for vk::Device {
		destroy_device: PFN_vkDestroyDevice,
		create_command_pool: PFN_vkCreateCommandPool,
		reset_command_pool: PFN_vkResetCommandPool,
		destroy_command_pool: PFN_vkDestroyCommandPool,
		allocate_command_buffers: PFN_vkAllocateCommandBuffers,
		free_command_buffers: PFN_vkFreeCommandBuffers,
		get_device_queue: PFN_vkGetDeviceQueue,
		create_semaphore: PFN_vkCreateSemaphore,
		destroy_semaphore: PFN_vkDestroySemaphore,
		create_image: PFN_vkCreateImage,
		destroy_image: PFN_vkDestroyImage,
		create_swapchain_khr: PFN_vkCreateSwapchainKHR,
		destroy_swapchain_khr: PFN_vkDestroySwapchainKHR,
		get_swapchain_images_khr: PFN_vkGetSwapchainImagesKHR,
		acquire_next_image_khr: PFN_vkAcquireNextImageKHR,
		get_image_memory_requirements: PFN_vkGetImageMemoryRequirements,
		get_image_subresource_layout: PFN_vkGetImageSubresourceLayout,
		create_image_view: PFN_vkCreateImageView,
		destroy_image_view: PFN_vkDestroyImageView,
		create_render_pass: PFN_vkCreateRenderPass,
		destroy_render_pass: PFN_vkDestroyRenderPass,
		create_pipeline_cache: PFN_vkCreatePipelineCache,
		get_pipeline_cache_data: PFN_vkGetPipelineCacheData,
		destroy_pipeline_cache: PFN_vkDestroyPipelineCache,
		create_framebuffer: PFN_vkCreateFramebuffer,
		destroy_framebuffer: PFN_vkDestroyFramebuffer,
		allocate_memory: PFN_vkAllocateMemory,
		free_memory: PFN_vkFreeMemory,
		map_memory: PFN_vkMapMemory,
		unmap_memory: PFN_vkUnmapMemory,
		flush_mapped_memory_ranges: PFN_vkFlushMappedMemoryRanges,
		invalidate_mapped_memory_ranges: PFN_vkInvalidateMappedMemoryRanges,
		bind_image_memory: PFN_vkBindImageMemory,
		bind_buffer_memory: PFN_vkBindBufferMemory,
		create_shader_module: PFN_vkCreateShaderModule,
		destroy_shader_module: PFN_vkDestroyShaderModule,
		create_sampler: PFN_vkCreateSampler,
		destroy_sampler: PFN_vkDestroySampler,
		create_buffer: PFN_vkCreateBuffer,
		destroy_buffer: PFN_vkDestroyBuffer,
		create_buffer_view: PFN_vkCreateBufferView,
		destroy_buffer_view: PFN_vkDestroyBufferView,
		get_buffer_memory_requirements: PFN_vkGetBufferMemoryRequirements,
		create_descriptor_pool: PFN_vkCreateDescriptorPool,
		reset_descriptor_pool: PFN_vkResetDescriptorPool,
		destroy_descriptor_pool: PFN_vkDestroyDescriptorPool,
		create_descriptor_set_layout: PFN_vkCreateDescriptorSetLayout,
		destroy_descriptor_set_layout: PFN_vkDestroyDescriptorSetLayout,
		allocate_descriptor_sets: PFN_vkAllocateDescriptorSets,
		update_descriptor_sets: PFN_vkUpdateDescriptorSets,
		free_descriptor_sets: PFN_vkFreeDescriptorSets,
		create_pipeline_layout: PFN_vkCreatePipelineLayout,
		destroy_pipeline_layout: PFN_vkDestroyPipelineLayout,
		create_graphics_pipelines: PFN_vkCreateGraphicsPipelines,
		create_compute_pipelines: PFN_vkCreateComputePipelines,
		destroy_pipeline: PFN_vkDestroyPipeline,
		create_fence: PFN_vkCreateFence,
		destroy_fence: PFN_vkDestroyFence,
		reset_fences: PFN_vkResetFences,
		wait_for_fences: PFN_vkWaitForFences,
		get_fence_status: PFN_vkGetFenceStatus,
		device_wait_idle: PFN_vkDeviceWaitIdle,
		create_query_pool: PFN_vkCreateQueryPool,
		destroy_query_pool: PFN_vkDestroyQueryPool,
		get_query_pool_results: PFN_vkGetQueryPoolResults,
		create_event: PFN_vkCreateEvent,
		destroy_event: PFN_vkDestroyEvent,
		get_event_status: PFN_vkGetEventStatus,
		set_event: PFN_vkSetEvent,
		reset_event: PFN_vkResetEvent,
	}
	nested {
		command_buffer_functions: CommandBufferFunctions,
		queue_functions: QueueFunctions,
	}
}

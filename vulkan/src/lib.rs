pub mod alloc;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod function_table;
pub mod instance;
pub mod lazy_function;
pub mod library;
pub mod sub_object;
pub mod swapchain;
pub mod unique;

#[cfg(test)]
mod test_util;

pub use ash::{vk, LoadingError};
pub use crate::{
	alloc::{Allocator, AllocatorExt, CheckedAllocator, LeakCheckAllocator},
	command::CommandBuffer,
	descriptor::DescriptorSet,
	device::{Device, Queue},
	instance::Instance,
	lazy_function::{LazyFunction, ProcAddr, Resolver},
	library::Library,
	sub_object::{Owner, SubObject, SubObjectTraits},
	swapchain::Swapchain,
	unique::{make_unique, Unique},
};

use std::{ffi::c_void, ptr};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to load the vulkan library: {0}")]
	Loading(#[from] LoadingError),
	#[error("vulkan call failed: {0}")]
	Vk(#[from] vk::Result),
	#[error("no physical device available")]
	NoPhysicalDevice,
	#[error("no queue family supports {0:?}")]
	NoQueueFamily(vk::QueueFlags),
}

/// Host allocation callbacks handed to every create and destroy call of an object.
///
/// The driver only reads these, and the user data they point at is the caller's to synchronize.
#[derive(Clone, Copy)]
pub struct AllocationCallbacks(pub vk::AllocationCallbacks);
unsafe impl Send for AllocationCallbacks {}
unsafe impl Sync for AllocationCallbacks {}

impl AllocationCallbacks {
	pub(crate) fn copied(callbacks: Option<&vk::AllocationCallbacks>) -> Option<Self> {
		callbacks.map(|callbacks| Self(*callbacks))
	}
}

pub(crate) fn callbacks_ptr(callbacks: &Option<AllocationCallbacks>) -> *const vk::AllocationCallbacks {
	match callbacks {
		Some(callbacks) => &callbacks.0,
		None => ptr::null(),
	}
}

/// Finds the first structure of type `s_type` in a `p_next` chain.
///
/// # Safety
/// `next` must be null or the start of a valid chain, and `T` must be the structure `s_type` names.
pub(crate) unsafe fn find_in_chain<'a, T>(mut next: *const c_void, s_type: vk::StructureType) -> Option<&'a T> {
	while !next.is_null() {
		let base = &*(next as *const vk::BaseInStructure);
		if base.s_type == s_type {
			return Some(&*(next as *const T));
		}
		next = base.p_next as *const c_void;
	}
	None
}

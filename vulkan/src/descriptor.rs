use crate::{device::Device, lazy_function::LazyFunction, sub_object::DescriptorPool};
use ash::vk;
use log::{debug, warn};
use std::mem;

/// Owns one descriptor set and frees it back to its pool, which must allow freeing individual sets.
pub struct DescriptorSet<'a> {
	vk: vk::DescriptorSet,
	pool: vk::DescriptorPool,
	device: vk::Device,
	free: &'a LazyFunction<vk::PFN_vkFreeDescriptorSets, vk::Device>,
}
impl<'a> DescriptorSet<'a> {
	pub fn new(raw: vk::DescriptorSet, pool: &'a DescriptorPool<'_>, device: &'a Device<'_>) -> Self {
		Self { vk: raw, pool: pool.raw(), device: device.raw(), free: &device.free_descriptor_sets }
	}

	pub fn raw(&self) -> vk::DescriptorSet {
		self.vk
	}

	pub fn pool(&self) -> vk::DescriptorPool {
		self.pool
	}

	pub fn is_null(&self) -> bool {
		self.vk == vk::DescriptorSet::null()
	}

	pub fn take(&mut self) -> Self {
		Self {
			vk: mem::replace(&mut self.vk, vk::DescriptorSet::null()),
			pool: self.pool,
			device: self.device,
			free: self.free,
		}
	}
}
impl<'a> Drop for DescriptorSet<'a> {
	fn drop(&mut self) {
		if self.is_null() {
			return;
		}

		debug!("freeing {:?} from {:?}", self.vk, self.pool);
		let result = unsafe { (self.free)(self.device, self.pool, 1, &self.vk) };
		if result != vk::Result::SUCCESS {
			warn!("freeing {:?} failed: {}", self.vk, result);
		}
	}
}
impl<'a> From<&DescriptorSet<'a>> for vk::DescriptorSet {
	fn from(set: &DescriptorSet<'a>) -> Self {
		set.vk
	}
}

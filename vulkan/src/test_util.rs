use crate::lazy_function::Resolver;
use ash::vk::{self, Handle};
use lazy_static::lazy_static;
use std::{
	collections::HashMap,
	env,
	ffi::CStr,
	mem,
	os::raw::c_char,
	process::{Command, ExitStatus, Stdio},
	slice,
	sync::{
		atomic::{AtomicU64, Ordering},
		Mutex,
	},
};

pub const DEVICE_ID: u32 = 0x1c02;
pub const VENDOR_ID: u32 = 0x10de;
pub const DRIVER_VERSION: u32 = 0x0042_0001;
pub const MEMORY_TYPE_COUNT: u32 = 3;

/// One call into the fake driver that the tests want to look at afterwards.
#[derive(Clone, Debug)]
pub struct Call {
	pub function: &'static str,
	pub owner: u64,
	pub handle: u64,
	pub pool: u64,
	/// User data of the allocation callbacks, or 0 when none were passed.
	pub callbacks: usize,
	pub value: u64,
}

lazy_static! {
	static ref CALLS: Mutex<Vec<Call>> = Mutex::new(Vec::new());
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

/// Handles are never reused, so tests running in parallel can filter the shared call log by handle.
pub fn fresh_handle() -> u64 {
	NEXT_HANDLE.fetch_add(0x10, Ordering::Relaxed)
}

pub fn fresh<T: Handle>() -> T {
	T::from_raw(fresh_handle())
}

pub fn calls(handle: u64) -> Vec<Call> {
	CALLS.lock().unwrap().iter().filter(|call| call.handle == handle).cloned().collect()
}

/// Every destroy or free call made on `handle`.
pub fn destroyed(handle: u64) -> Vec<Call> {
	calls(handle).into_iter().filter(|call| call.function == "destroy" || call.function == "free").collect()
}

/// `callbacks` is logged as its user data pointer so tests can tell which callbacks were passed.
unsafe fn record(function: &'static str, owner: u64, handle: u64, callbacks: *const vk::AllocationCallbacks) {
	let callbacks = if callbacks.is_null() { 0 } else { (*callbacks).p_user_data as usize };
	CALLS.lock().unwrap().push(Call { function, owner, handle, pool: 0, callbacks, value: 0 });
}

/// Resolves against the fake driver below and counts every lookup by name.
#[derive(Default)]
pub struct FakeDriver {
	lookups: Mutex<HashMap<String, usize>>,
}
impl FakeDriver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn lookups(&self, name: &str) -> usize {
		self.lookups.lock().unwrap().get(name).copied().unwrap_or(0)
	}

	pub fn total_lookups(&self) -> usize {
		self.lookups.lock().unwrap().values().sum()
	}
}
impl<H> Resolver<H> for FakeDriver {
	fn proc_addr(&self, _handle: H, name: &CStr) -> vk::PFN_vkVoidFunction {
		*self.lookups.lock().unwrap().entry(name.to_string_lossy().into_owned()).or_default() += 1;
		lookup(name)
	}
}

const ABORT_MARKER: &str = "VULKAN_EXPECT_ABORT";

/// Re-runs the current test in a child process with `body` enabled and expects the child to be killed by an abort.
///
/// A panic doesn't count, since it can be caught.
pub fn expect_abort(test: &str, body: impl FnOnce()) {
	if in_child(test) {
		body();
		return;
	}

	let status = run_in_child(test);
	assert!(aborted(&status), "{} was expected to abort but exited with {}", test, status);
}

fn in_child(test: &str) -> bool {
	env::var(ABORT_MARKER).map_or(false, |marked| marked == test)
}

fn run_in_child(test: &str) -> ExitStatus {
	Command::new(env::current_exe().unwrap())
		.args([test, "--exact", "--nocapture", "--test-threads=1"])
		.env(ABORT_MARKER, test)
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.unwrap()
}

#[cfg(unix)]
fn aborted(status: &ExitStatus) -> bool {
	use std::os::unix::process::ExitStatusExt;

	// SIGABRT
	status.signal() == Some(6)
}

#[cfg(windows)]
fn aborted(status: &ExitStatus) -> bool {
	// process::abort is a fast fail on windows
	status.code() == Some(0xC000_0409_u32 as i32)
}

macro_rules! entry {
	($pfn:ty, $function:expr) => {
		Some(unsafe { mem::transmute::<$pfn, unsafe extern "system" fn()>($function) })
	};
}

pub fn lookup(name: &CStr) -> vk::PFN_vkVoidFunction {
	match name.to_bytes() {
		b"vkGetInstanceProcAddr" => entry!(vk::PFN_vkGetInstanceProcAddr, get_instance_proc_addr),
		b"vkGetDeviceProcAddr" => entry!(vk::PFN_vkGetDeviceProcAddr, get_device_proc_addr),
		b"vkCreateInstance" => entry!(vk::PFN_vkCreateInstance, create_instance),
		b"vkDestroyInstance" => entry!(vk::PFN_vkDestroyInstance, destroy_owner::<vk::Instance>),
		b"vkEnumeratePhysicalDevices" => entry!(vk::PFN_vkEnumeratePhysicalDevices, enumerate_physical_devices),
		b"vkGetPhysicalDeviceProperties" => {
			entry!(vk::PFN_vkGetPhysicalDeviceProperties, get_physical_device_properties)
		},
		b"vkGetPhysicalDeviceQueueFamilyProperties" => {
			entry!(vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties, get_physical_device_queue_family_properties)
		},
		b"vkGetPhysicalDeviceMemoryProperties" => {
			entry!(vk::PFN_vkGetPhysicalDeviceMemoryProperties, get_physical_device_memory_properties)
		},
		b"vkEnumerateInstanceLayerProperties" => {
			entry!(vk::PFN_vkEnumerateInstanceLayerProperties, enumerate_instance_layer_properties)
		},
		b"vkEnumerateInstanceExtensionProperties" => {
			entry!(vk::PFN_vkEnumerateInstanceExtensionProperties, enumerate_instance_extension_properties)
		},
		b"vkCreateDevice" => entry!(vk::PFN_vkCreateDevice, create_device),
		b"vkDestroyDevice" => entry!(vk::PFN_vkDestroyDevice, destroy_owner::<vk::Device>),
		b"vkDestroySurfaceKHR" => entry!(vk::PFN_vkDestroySurfaceKHR, destroy_child::<vk::Instance, vk::SurfaceKHR>),
		b"vkGetDeviceQueue" => entry!(vk::PFN_vkGetDeviceQueue, get_device_queue),
		b"vkDeviceWaitIdle" => entry!(vk::PFN_vkDeviceWaitIdle, wait_idle::<vk::Device>),
		b"vkQueueWaitIdle" => entry!(vk::PFN_vkQueueWaitIdle, wait_idle::<vk::Queue>),
		b"vkQueueSubmit" => entry!(vk::PFN_vkQueueSubmit, queue_submit),
		b"vkCreateFence" => entry!(vk::PFN_vkCreateFence, create_child::<vk::FenceCreateInfo, vk::Fence>),
		b"vkDestroyFence" => entry!(vk::PFN_vkDestroyFence, destroy_child::<vk::Device, vk::Fence>),
		b"vkWaitForFences" => entry!(vk::PFN_vkWaitForFences, wait_for_fences),
		b"vkCreateEvent" => entry!(vk::PFN_vkCreateEvent, create_child::<vk::EventCreateInfo, vk::Event>),
		b"vkDestroyEvent" => entry!(vk::PFN_vkDestroyEvent, destroy_child::<vk::Device, vk::Event>),
		b"vkCreateSemaphore" => {
			entry!(vk::PFN_vkCreateSemaphore, create_child::<vk::SemaphoreCreateInfo, vk::Semaphore>)
		},
		b"vkDestroySemaphore" => entry!(vk::PFN_vkDestroySemaphore, destroy_child::<vk::Device, vk::Semaphore>),
		b"vkDestroyBuffer" => entry!(vk::PFN_vkDestroyBuffer, destroy_child::<vk::Device, vk::Buffer>),
		b"vkDestroyImage" => entry!(vk::PFN_vkDestroyImage, destroy_child::<vk::Device, vk::Image>),
		b"vkFreeMemory" => entry!(vk::PFN_vkFreeMemory, destroy_child::<vk::Device, vk::DeviceMemory>),
		b"vkCreateSwapchainKHR" => {
			entry!(vk::PFN_vkCreateSwapchainKHR, create_child::<vk::SwapchainCreateInfoKHR, vk::SwapchainKHR>)
		},
		b"vkDestroySwapchainKHR" => {
			entry!(vk::PFN_vkDestroySwapchainKHR, destroy_child::<vk::Device, vk::SwapchainKHR>)
		},
		b"vkCreateCommandPool" => {
			entry!(vk::PFN_vkCreateCommandPool, create_child::<vk::CommandPoolCreateInfo, vk::CommandPool>)
		},
		b"vkDestroyCommandPool" => entry!(vk::PFN_vkDestroyCommandPool, destroy_child::<vk::Device, vk::CommandPool>),
		b"vkAllocateCommandBuffers" => entry!(vk::PFN_vkAllocateCommandBuffers, allocate_command_buffers),
		b"vkFreeCommandBuffers" => entry!(vk::PFN_vkFreeCommandBuffers, free_command_buffers),
		b"vkBeginCommandBuffer" => entry!(vk::PFN_vkBeginCommandBuffer, begin_command_buffer),
		b"vkEndCommandBuffer" => entry!(vk::PFN_vkEndCommandBuffer, end_command_buffer),
		b"vkCmdSetDeviceMask" => entry!(vk::PFN_vkCmdSetDeviceMask, cmd_set_device_mask),
		b"vkCreateDescriptorSetLayout" => {
			entry!(
				vk::PFN_vkCreateDescriptorSetLayout,
				create_child::<vk::DescriptorSetLayoutCreateInfo, vk::DescriptorSetLayout>
			)
		},
		b"vkDestroyDescriptorSetLayout" => {
			entry!(vk::PFN_vkDestroyDescriptorSetLayout, destroy_child::<vk::Device, vk::DescriptorSetLayout>)
		},
		b"vkCreateDescriptorPool" => {
			entry!(vk::PFN_vkCreateDescriptorPool, create_child::<vk::DescriptorPoolCreateInfo, vk::DescriptorPool>)
		},
		b"vkDestroyDescriptorPool" => {
			entry!(vk::PFN_vkDestroyDescriptorPool, destroy_child::<vk::Device, vk::DescriptorPool>)
		},
		b"vkAllocateDescriptorSets" => entry!(vk::PFN_vkAllocateDescriptorSets, allocate_descriptor_sets),
		b"vkFreeDescriptorSets" => entry!(vk::PFN_vkFreeDescriptorSets, free_descriptor_sets),
		_ => None,
	}
}

pub unsafe extern "system" fn get_instance_proc_addr(
	_instance: vk::Instance,
	name: *const c_char,
) -> vk::PFN_vkVoidFunction {
	lookup(CStr::from_ptr(name))
}

unsafe extern "system" fn get_device_proc_addr(_device: vk::Device, name: *const c_char) -> vk::PFN_vkVoidFunction {
	lookup(CStr::from_ptr(name))
}

unsafe extern "system" fn create_instance(
	_info: *const vk::InstanceCreateInfo,
	_callbacks: *const vk::AllocationCallbacks,
	instance: *mut vk::Instance,
) -> vk::Result {
	*instance = fresh();
	vk::Result::SUCCESS
}

pub const LAYERS: [&str; 2] = ["VK_LAYER_KHRONOS_validation", "VK_LAYER_MESA_device_select"];
pub const EXTENSIONS: [&str; 1] = ["VK_KHR_surface"];

/// Runs the two-call enumeration protocol over `items`, filling `out` with `make`.
unsafe fn enumerate<T>(items: &[&str], count: *mut u32, out: *mut T, make: impl Fn(&str) -> T) -> vk::Result {
	if out.is_null() {
		*count = items.len() as u32;
		return vk::Result::SUCCESS;
	}
	let written = (*count as usize).min(items.len());
	for (i, &item) in items[..written].iter().enumerate() {
		out.add(i).write(make(item));
	}
	*count = written as u32;
	if written < items.len() {
		vk::Result::INCOMPLETE
	} else {
		vk::Result::SUCCESS
	}
}

fn fixed_name(name: &str) -> [c_char; vk::MAX_EXTENSION_NAME_SIZE] {
	let mut fixed = [0; vk::MAX_EXTENSION_NAME_SIZE];
	for (dst, &src) in fixed.iter_mut().zip(name.as_bytes()) {
		*dst = src as c_char;
	}
	fixed
}

unsafe extern "system" fn enumerate_instance_layer_properties(
	count: *mut u32,
	properties: *mut vk::LayerProperties,
) -> vk::Result {
	enumerate(&LAYERS, count, properties, |name| vk::LayerProperties {
		layer_name: fixed_name(name),
		spec_version: vk::API_VERSION_1_1,
		..Default::default()
	})
}

unsafe extern "system" fn enumerate_instance_extension_properties(
	_layer_name: *const c_char,
	count: *mut u32,
	properties: *mut vk::ExtensionProperties,
) -> vk::Result {
	enumerate(&EXTENSIONS, count, properties, |name| vk::ExtensionProperties {
		extension_name: fixed_name(name),
		spec_version: 25,
	})
}

unsafe extern "system" fn enumerate_physical_devices(
	_instance: vk::Instance,
	count: *mut u32,
	devices: *mut vk::PhysicalDevice,
) -> vk::Result {
	if devices.is_null() {
		*count = 1;
	} else if *count >= 1 {
		*devices = fresh();
		*count = 1;
	}
	vk::Result::SUCCESS
}

unsafe extern "system" fn get_physical_device_properties(
	_physical_device: vk::PhysicalDevice,
	properties: *mut vk::PhysicalDeviceProperties,
) {
	*properties = vk::PhysicalDeviceProperties {
		device_id: DEVICE_ID,
		vendor_id: VENDOR_ID,
		driver_version: DRIVER_VERSION,
		device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
		..Default::default()
	};
}

unsafe extern "system" fn get_physical_device_queue_family_properties(
	_physical_device: vk::PhysicalDevice,
	count: *mut u32,
	properties: *mut vk::QueueFamilyProperties,
) {
	let families = [
		vk::QueueFamilyProperties { queue_flags: vk::QueueFlags::TRANSFER, queue_count: 2, ..Default::default() },
		vk::QueueFamilyProperties {
			queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
			queue_count: 1,
			..Default::default()
		},
	];
	if properties.is_null() {
		*count = families.len() as u32;
		return;
	}
	let written = (*count as usize).min(families.len());
	slice::from_raw_parts_mut(properties, written).copy_from_slice(&families[..written]);
	*count = written as u32;
}

unsafe extern "system" fn get_physical_device_memory_properties(
	_physical_device: vk::PhysicalDevice,
	properties: *mut vk::PhysicalDeviceMemoryProperties,
) {
	*properties = vk::PhysicalDeviceMemoryProperties { memory_type_count: MEMORY_TYPE_COUNT, ..Default::default() };
}

unsafe extern "system" fn create_device(
	_physical_device: vk::PhysicalDevice,
	_info: *const vk::DeviceCreateInfo,
	_callbacks: *const vk::AllocationCallbacks,
	device: *mut vk::Device,
) -> vk::Result {
	*device = fresh();
	vk::Result::SUCCESS
}

unsafe extern "system" fn get_device_queue(_device: vk::Device, _family: u32, _index: u32, queue: *mut vk::Queue) {
	*queue = fresh();
}

unsafe extern "system" fn wait_idle<H: Handle>(handle: H) -> vk::Result {
	record("wait_idle", 0, handle.as_raw(), std::ptr::null());
	vk::Result::SUCCESS
}

unsafe extern "system" fn queue_submit(
	queue: vk::Queue,
	count: u32,
	_submits: *const vk::SubmitInfo,
	fence: vk::Fence,
) -> vk::Result {
	CALLS.lock().unwrap().push(Call {
		function: "submit",
		owner: queue.as_raw(),
		handle: fence.as_raw(),
		pool: 0,
		callbacks: 0,
		value: count as u64,
	});
	vk::Result::SUCCESS
}

unsafe extern "system" fn wait_for_fences(
	_device: vk::Device,
	count: u32,
	fences: *const vk::Fence,
	_wait_all: vk::Bool32,
	_timeout: u64,
) -> vk::Result {
	for fence in slice::from_raw_parts(fences, count as usize) {
		record("wait", 0, fence.as_raw(), std::ptr::null());
	}
	vk::Result::SUCCESS
}

unsafe extern "system" fn create_child<I, T: Handle>(
	_device: vk::Device,
	_info: *const I,
	_callbacks: *const vk::AllocationCallbacks,
	handle: *mut T,
) -> vk::Result {
	*handle = fresh();
	vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_owner<O: Handle>(owner: O, callbacks: *const vk::AllocationCallbacks) {
	record("destroy", 0, owner.as_raw(), callbacks);
}

unsafe extern "system" fn destroy_child<O: Handle, T: Handle>(
	owner: O,
	handle: T,
	callbacks: *const vk::AllocationCallbacks,
) {
	record("destroy", owner.as_raw(), handle.as_raw(), callbacks);
}

unsafe extern "system" fn allocate_command_buffers(
	_device: vk::Device,
	info: *const vk::CommandBufferAllocateInfo,
	buffers: *mut vk::CommandBuffer,
) -> vk::Result {
	for buffer in slice::from_raw_parts_mut(buffers, (*info).command_buffer_count as usize) {
		*buffer = fresh();
	}
	vk::Result::SUCCESS
}

unsafe extern "system" fn free_command_buffers(
	device: vk::Device,
	pool: vk::CommandPool,
	count: u32,
	buffers: *const vk::CommandBuffer,
) {
	let mut calls = CALLS.lock().unwrap();
	for buffer in slice::from_raw_parts(buffers, count as usize) {
		calls.push(Call {
			function: "free",
			owner: device.as_raw(),
			handle: buffer.as_raw(),
			pool: pool.as_raw(),
			callbacks: 0,
			value: count as u64,
		});
	}
}

unsafe extern "system" fn begin_command_buffer(
	buffer: vk::CommandBuffer,
	_info: *const vk::CommandBufferBeginInfo,
) -> vk::Result {
	record("begin", 0, buffer.as_raw(), std::ptr::null());
	vk::Result::SUCCESS
}

unsafe extern "system" fn end_command_buffer(buffer: vk::CommandBuffer) -> vk::Result {
	record("end", 0, buffer.as_raw(), std::ptr::null());
	vk::Result::SUCCESS
}

unsafe extern "system" fn cmd_set_device_mask(buffer: vk::CommandBuffer, mask: u32) {
	CALLS.lock().unwrap().push(Call {
		function: "set_device_mask",
		owner: 0,
		handle: buffer.as_raw(),
		pool: 0,
		callbacks: 0,
		value: mask as u64,
	});
}

unsafe extern "system" fn allocate_descriptor_sets(
	_device: vk::Device,
	info: *const vk::DescriptorSetAllocateInfo,
	sets: *mut vk::DescriptorSet,
) -> vk::Result {
	for set in slice::from_raw_parts_mut(sets, (*info).descriptor_set_count as usize) {
		*set = fresh();
	}
	vk::Result::SUCCESS
}

unsafe extern "system" fn free_descriptor_sets(
	device: vk::Device,
	pool: vk::DescriptorPool,
	count: u32,
	sets: *const vk::DescriptorSet,
) -> vk::Result {
	let mut calls = CALLS.lock().unwrap();
	for set in slice::from_raw_parts(sets, count as usize) {
		calls.push(Call {
			function: "free",
			owner: device.as_raw(),
			handle: set.as_raw(),
			pool: pool.as_raw(),
			callbacks: 0,
			value: count as u64,
		});
	}
	vk::Result::SUCCESS
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn a_panicking_child_is_not_an_abort() {
		const TEST: &str = "test_util::tests::a_panicking_child_is_not_an_abort";
		if in_child(TEST) {
			panic!("unwinds instead of aborting");
		}

		let status = run_in_child(TEST);
		assert!(!status.success());
		assert!(!aborted(&status));
	}

	#[test]
	fn an_aborting_child_is_recognized() {
		const TEST: &str = "test_util::tests::an_aborting_child_is_recognized";
		if in_child(TEST) {
			std::process::abort();
		}

		assert!(aborted(&run_in_child(TEST)));
	}
}

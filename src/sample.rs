use crate::config::Config;
use ash::vk;
use log::{debug, info};
use std::ffi::{CStr, CString};
use vulkan::{Allocator, Error, Library};

/// Walks the whole object hierarchy once: library, instance, device, then a few objects of every ownership kind.
pub fn run(allocator: &dyn Allocator, config: &Config) -> Result<(), Error> {
	let library = Library::new()?;
	if let Ok(layers) = library.layer_properties() {
		for layer in &layers {
			debug!("layer {:?}", unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) });
		}
	}

	let name = CString::new(config.app_name).unwrap_or_default();
	let app_info = vk::ApplicationInfo::builder()
		.application_name(&name)
		.application_version(config.app_version)
		.engine_name(&name)
		.engine_version(config.app_version)
		.api_version(vk::API_VERSION_1_1);
	let ci = vk::InstanceCreateInfo::builder().application_info(&app_info);
	let instance = library.create_instance(allocator, &ci, None)?;

	let physical_device = instance.enumerate_physical_devices()?.into_iter().next().ok_or(Error::NoPhysicalDevice)?;
	let properties = instance.physical_device_properties(physical_device);
	info!("using {:?}", unsafe { CStr::from_ptr(properties.device_name.as_ptr()) });

	let family = instance
		.queue_family_properties(physical_device)
		.iter()
		.position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
		.ok_or(Error::NoQueueFamily(vk::QueueFlags::GRAPHICS))? as u32;

	let priorities = [1.0];
	let queue_cis =
		[vk::DeviceQueueCreateInfo::builder().queue_family_index(family).queue_priorities(&priorities).build()];
	let ci = vk::DeviceCreateInfo::builder().queue_create_infos(&queue_cis);
	let device = instance.create_device(allocator, physical_device, &ci, None)?;
	info!(
		"device {:#x} from vendor {:#x}, driver version {:#x}, {} memory types",
		device.device_id(),
		device.vendor_id(),
		device.driver_version(),
		device.memory_properties().memory_type_count,
	);

	let queue = device.get_queue(family, 0);
	let pool = device.create_command_pool(family, vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)?;
	let mut cmd = device.allocate_command_buffer(&pool, vk::CommandBufferLevel::PRIMARY)?;
	let event = device.create_event()?;

	cmd.begin(&vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT))?;
	unsafe { (cmd.cmd_set_event)(cmd.raw(), event.raw(), vk::PipelineStageFlags::ALL_COMMANDS) };
	cmd.end()?;
	debug!("recorded {:?} with device mask {:#b}", cmd.raw(), cmd.device_mask());

	let fence = device.create_fence(false)?;
	queue.submit(&[&cmd], Some(&fence))?;
	device.wait_for_fence(&fence, u64::MAX)?;
	let status = unsafe { (device.get_event_status)(device.raw(), event.raw()) };
	info!("event after submission: {:?}", status);

	let semaphore = device.create_semaphore()?;
	debug!("created {:?}", semaphore.raw());

	let bindings = [vk::DescriptorSetLayoutBinding::builder()
		.binding(0)
		.descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
		.descriptor_count(1)
		.stage_flags(vk::ShaderStageFlags::COMPUTE)
		.build()];
	let layout = device.create_descriptor_set_layout(&bindings)?;
	let sizes = [vk::DescriptorPoolSize { ty: vk::DescriptorType::STORAGE_BUFFER, descriptor_count: 1 }];
	let descriptor_pool = device.create_descriptor_pool(1, &sizes)?;
	let set = device.allocate_descriptor_set(&descriptor_pool, &layout)?;
	debug!("allocated {:?} from {:?}", set.raw(), set.pool());

	queue.wait_idle()?;
	device.wait_idle()?;
	Ok(())
}

mod config;
mod sample;

use config::Config;
use log::{error, info, warn};
use simplelog::SimpleLogger;
use std::process;
#[cfg(debug_assertions)]
use vulkan::CheckedAllocator;
use vulkan::{Allocator, LeakCheckAllocator};

fn main() {
	let config = Config::from_env();
	SimpleLogger::init(config.log_level, Default::default()).unwrap();
	if let Some(level) = &config.rejected_log_level {
		warn!("ignoring unknown log level {:?}", level);
	}

	let root = LeakCheckAllocator::new();
	let code = {
		#[cfg(debug_assertions)]
		let checked = CheckedAllocator::new(&root);
		#[cfg(debug_assertions)]
		let allocator: &dyn Allocator = &checked;
		#[cfg(not(debug_assertions))]
		let allocator: &dyn Allocator = &root;

		match sample::run(allocator, &config) {
			Ok(()) => 0,
			Err(err) => {
				error!("{}", err);
				1
			},
		}
	};

	let leaked = root.currently_allocated_bytes();
	if leaked != 0 {
		warn!("{} bytes still allocated on exit", leaked);
	}
	info!(
		"{} allocations, {} bytes over the whole run",
		root.total_number_of_allocations(),
		root.total_allocated_bytes()
	);

	info!("RETURN: {}", code);
	process::exit(code);
}

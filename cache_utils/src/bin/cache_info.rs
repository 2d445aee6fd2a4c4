#![deny(unsafe_op_in_unsafe_fn)]

use cache_utils::cache_info::get_cache_info;

use std::process;

pub fn main() {
    env_logger::init();

    match get_cache_info() {
        Ok(caches) => {
            for cache in caches {
                print!("{}", cache);
            }
        }
        Err(e) => {
            eprintln!("cache_info: {}", e);
            process::exit(1);
        }
    }
}

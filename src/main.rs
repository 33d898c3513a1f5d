use multicall::{Runtime, Settings};
use std::env;
use std::process;

fn main() {
    let filter = env::var("MULTICALL_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    env_logger::Builder::new().parse_filters(&filter).init();

    let runtime = match Runtime::builder()
        .settings(Settings::from_env())
        .entries(multicall::applets())
        .on_exit(|code| process::exit(code))
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };
    process::exit(runtime.run_env());
}

// minjs: a minimal script shell with a native call bridge

use minjs::shell::constants::{EXIT_RUNTIME_ERROR, SHELL_STACK_SIZE};
use minjs::shell::{Session, Shell};
use tracing_subscriber::EnvFilter;

fn run(args: &[String]) -> i32 {
    // Stack limits are measured from here.
    let stack_marker = 0u8;
    let stack_base = std::hint::black_box(&stack_marker) as *const u8 as usize;

    let mut shell = Shell::new(Session::stdio(stack_base));
    shell.run(args)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MINJS_LOG").unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let thread_args = args.clone();
    let spawned = std::thread::Builder::new()
        .name("minjs".to_string())
        .stack_size(SHELL_STACK_SIZE)
        .spawn(move || run(&thread_args));

    let code = match spawned {
        Ok(handle) => handle.join().unwrap_or(EXIT_RUNTIME_ERROR),
        Err(err) => {
            tracing::debug!(%err, "running on the main thread");
            run(&args)
        }
    };
    std::process::exit(code);
}

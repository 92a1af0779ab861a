use std::{
    env,
    path::Path,
    process::ExitCode,
    sync::atomic::{AtomicUsize, Ordering},
};

use prodcon::{trace::init_tracing, Config, Controller};

fn run_demo(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let next = AtomicUsize::new(0);
    let sum = AtomicUsize::new(0);

    let controller = Controller::new(
        || next.fetch_add(1, Ordering::Relaxed),
        |n: usize| {
            sum.fetch_add(n, Ordering::Relaxed);
        },
        config,
    )?;
    let report = controller.exec()?;

    println!(
        "{} producers, {} consumers, capacity {}",
        config.producers, config.consumers, config.capacity
    );
    println!(
        "produced {} consumed {} discarded {} peak queue length {}",
        report.produced, report.consumed, report.discarded, report.peak_queue_len
    );
    for worker in &report.workers {
        println!("  {:<12} {:>6}", worker.id.to_string(), worker.stats.handled);
    }
    println!("sum of delivered items: {}", sum.load(Ordering::Relaxed));
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let config = match env::args_os().nth(1) {
        Some(path) => Config::load(Path::new(&path)),
        None => Ok(Config::default()),
    };

    match config.map_err(Into::into).and_then(run_demo) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("prodcon: {err}");
            ExitCode::FAILURE
        }
    }
}

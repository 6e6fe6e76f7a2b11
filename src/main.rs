use marketsearch::{Config, run};

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // One worker keeps the session on a single event loop; 0 means one per core.
    let runtime = match config.general.worker_threads {
        1 => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?,
        n => {
            let mut builder = tokio::runtime::Builder::new_multi_thread();
            builder.enable_all();
            if n > 0 {
                builder.worker_threads(n);
            }
            builder.build()?
        }
    };

    runtime.block_on(run())
}

mod animation;
mod app;
mod config;
mod controls;
mod cover;
mod error;
mod projection;
mod render;
mod scene;

fn main() {
    env_logger::init();
    log::info!("Cover slider starting up");

    if let Err(e) = app::run() {
        log::error!("Fatal error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            log::error!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

use chainstored::{
    args::Args,
    daemon::{get_log_dir, Node},
};
use log::{error, info};
use std::sync::{mpsc, Arc};

fn main() {
    let args = match Args::parse(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            println!("{err}");
            std::process::exit(1);
        }
    };

    let log_dir = get_log_dir(&args);
    if let Some(log_dir) = log_dir.as_deref() {
        if let Err(err) = std::fs::create_dir_all(log_dir) {
            println!("failed creating log dir {log_dir}: {err}");
            std::process::exit(1);
        }
    }
    chainstore_core::log::init_logger(log_dir.as_deref(), &args.log_level);
    chainstore_core::panic::configure_panic();

    let node = match Node::new(args).and_then(|node| {
        node.run()?;
        Ok(node)
    }) {
        Ok(node) => Arc::new(node),
        Err(err) => {
            error!("failed starting the node: {err}");
            std::process::exit(1);
        }
    };

    let (shutdown_sender, shutdown_receiver) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_sender.send(());
    })
    .expect("the termination handler is installed once");

    info!("chainstored is up (data dir: {})", node.app_dir().display());
    let _ = shutdown_receiver.recv();
    info!("shutting down");
    if let Err(err) = node.terminate() {
        error!("shutdown error: {err}");
    }
}

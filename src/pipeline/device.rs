use std::thread;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::bounded;

/// Opens a device on its own thread and waits until it is either ready or has
/// failed. On success `run` takes over the device on that same thread, so
/// devices that are not `Send` never cross threads.
pub fn spawn_opened<T, O, R>(name: &str, open: O, run: R) -> Result<thread::JoinHandle<()>>
where
    O: FnOnce() -> Result<T> + Send + 'static,
    R: FnOnce(T) + Send + 'static,
{
    let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || match open() {
            Ok(device) => {
                let _ = ready_tx.send(Ok(()));
                run(device);
            }
            Err(err) => {
                let _ = ready_tx.send(Err(err));
            }
        })
        .with_context(|| format!("failed to spawn {name} thread"))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(err)) => {
            let _ = handle.join();
            Err(err)
        }
        Err(_) => {
            let _ = handle.join();
            Err(anyhow!("{name} thread exited before the device opened"))
        }
    }
}

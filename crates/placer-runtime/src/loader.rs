use anyhow::Result;
use log::{error, info};
use placer_3d::ModelData;
use placer_gltf::load_gltf_model;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

/// Decodes a model on a worker thread and hands the result to `on_done`
/// there. Failures are logged and passed on; nothing retries.
pub fn spawn_model_load<F>(path: PathBuf, on_done: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce(Result<ModelData>) + Send + 'static,
{
    thread::Builder::new()
        .name("model-loader".into())
        .spawn(move || {
            let result = load_gltf_model(&path);
            match &result {
                Ok(model) => info!(
                    "loaded {} ({} mesh part(s))",
                    path.display(),
                    model.meshes.len()
                ),
                Err(err) => error!("model load failed: {err:#}"),
            }
            on_done(result);
        })
}

use std::sync::Arc;

use tempfile::tempdir;

use super::*;
use crate::factory::NullJobFactory;

#[tokio::test]
#[serial_test::serial(env_home)]
async fn build_assembles_a_runnable_app_and_shuts_down_cleanly() {
    let dir = tempdir().expect("tempdir");
    let mut config = Config::default();
    config.letterboxd.export_dir = dir.path().join("export");
    // Keep the runtime's own state inside the test's tempdir rather than
    // the real OS data directory.
    std::env::set_var("HOME", dir.path());

    let app = build(config, Arc::new(NullJobFactory)).await.expect("build succeeds");
    let _router = http_router(&app);
    app.shutdown().await;
}

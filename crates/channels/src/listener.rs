use async_trait::async_trait;

/// Observer for workspace installations.
///
/// Event sources (inbound-message providers, schedulers, ...) implement this
/// and register against a connector at construction time. The connector calls
/// [`on_new_installation`](InstallationListener::on_new_installation) once per
/// successful install or reinstall, after the workspace credential has been
/// registered and its channel directory loaded, so the listener can start
/// handling events on behalf of that workspace.
#[async_trait]
pub trait InstallationListener: Send + Sync {
    async fn on_new_installation(&self, workspace_id: &str, credential: &str);
}

//! Headless walkthrough of the Miyo shell
//!
//! Boots the shell on an in-memory stage, registers a parent, creates a
//! child and starts a child session, logging each screen change.
//!
//! ```text
//! miyo-shell [config.json]
//! ```

use anyhow::{Context, Result};
use app_core::{
    ChildProfileSelectViewModel, CreateChildViewModel, MemoryAuthService,
    MemoryChildProfileService, ParentLoginViewModel, ParentRegisterViewModel, Shell, ShellConfig,
};
use app_ui::{Layer, MemoryStage};
use chrono::NaiveDate;
use std::sync::Arc;

fn load_config() -> Result<ShellConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            ShellConfig::from_json(&json).with_context(|| format!("parsing config {}", path))
        }
        None => Ok(ShellConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = load_config()?;
    app_core::init_logging(&config.log_filter);

    let stage = Arc::new(MemoryStage::new());
    let shell = Shell::builder(
        stage.clone(),
        Arc::new(MemoryAuthService::new()),
        Arc::new(MemoryChildProfileService::new()),
    )
    .config(config)
    .build()?;
    let cx = shell.context().clone();

    shell.start().await?;
    let login = cx
        .nav
        .current_view_model::<ParentLoginViewModel>()
        .context("login screen not shown")?;
    login.open_register().await?;

    let register = cx
        .nav
        .current_view_model::<ParentRegisterViewModel>()
        .context("register screen not shown")?;
    register.name().set("Ada".into());
    register.email().set("ada@example.com".into());
    register.password().set("123456".into());
    register.confirm_password().set("123456".into());
    register.submit().await?;

    let create = cx
        .nav
        .current_view_model::<CreateChildViewModel>()
        .context("create-child screen not shown")?;
    create.child_name().set("Deniz".into());
    let birth_date = NaiveDate::from_ymd_opt(2018, 5, 1).context("invalid birth date")?;
    create.birth_date().set(Some(birth_date));
    create.submit().await?;
    cx.tasks.wait_idle().await;

    let select = cx
        .nav
        .current_view_model::<ChildProfileSelectViewModel>()
        .context("profile selection not shown")?;
    let child = select.children().get(0).context("no child listed")?;
    select.select_child(&child.id).await?;
    cx.tasks.wait_idle().await;

    tracing::info!(
        current = ?cx.nav.current_screen_id(),
        live = ?stage.live_screens(Layer::Screens),
        "Walkthrough finished"
    );

    shell.shutdown();
    Ok(())
}

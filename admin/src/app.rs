use std::{ops::Deref, sync::Arc};

use codeloom_controller::Controller;

pub struct AppInner {
    pub controller: Controller,
    pub admin_api_key: String,
}

#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl Deref for App {
    type Target = AppInner;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl App {
    pub fn new(controller: Controller, admin_api_key: String) -> Self {
        Self {
            inner: Arc::new(AppInner { controller, admin_api_key }),
        }
    }
}

use std::{ops::Deref, sync::Arc};

use codeloom_auth::TokenCodec;
use codeloom_controller::Controller;

pub struct AppInner {
    pub controller: Controller,
    pub tokens: TokenCodec,
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
    pub fn new(controller: Controller, tokens: TokenCodec) -> Self {
        Self { inner: Arc::new(AppInner { controller, tokens }) }
    }
}

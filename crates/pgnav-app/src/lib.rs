// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod browser;
pub mod dispatch;
pub mod notify;
pub mod payload;
pub mod request;
pub mod rewrite;
pub mod selection;
pub mod view;

pub use browser::*;
pub use dispatch::*;
pub use notify::*;
pub use payload::*;
pub use request::*;
pub use rewrite::*;
pub use selection::*;
pub use view::*;

#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod content;

#[cfg(not(target_arch = "wasm32"))]
pub use app::App;
pub use content::{
    ContentPanel, FormState, PanelState, ACCOUNT_ID_KEY, ADD_MESSAGE_FAILED, BOATLOAD_OF_GAS,
    REFRESH_MESSAGES_FAILED, SUGGESTED_DONATION,
};

//! WebAssembly bindings
//!
//! Only in-memory parsing is exposed; there is no filesystem in the browser.

use crate::ir::LanguageId;
use wasm_bindgen::prelude::*;

/// Parse `source` as `language` (a name such as `"typescript"` or `"py"`)
/// and return the index-mode `File`
///
/// A damaged parse still returns its partial `File`.
#[wasm_bindgen(js_name = parseSource)]
pub fn parse_source(source: &str, language: &str) -> Result<JsValue, JsValue> {
    let language = LanguageId::from_name(language);
    let file = match crate::parse_file(source, language) {
        Ok(file) => file,
        Err(err) if err.has_partial() => match err.take_partial() {
            Some(file) => file,
            None => return Err(JsValue::from_str("parse failed")),
        },
        Err(err) => return Err(JsValue::from_str(&err.to_string())),
    };
    serde_wasm_bindgen::to_value(&file).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Names of the languages with an adapter
#[wasm_bindgen(js_name = supportedLanguages)]
pub fn supported_languages() -> Vec<JsValue> {
    crate::supported_languages()
        .into_iter()
        .map(|language| JsValue::from_str(language.name()))
        .collect()
}

/// Crate version
#[wasm_bindgen]
pub fn version() -> String {
    crate::VERSION.to_string()
}

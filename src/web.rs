use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use js_sys::{Array, Function, Object, Reflect};
use log::{error, info, warn};
use wasm_bindgen::prelude::*;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::handlers::register_defaults;
use crate::registrar::{HostNamespace, Registrar};
use crate::registry::{Binding, Registry};
use crate::residency::{ResidencyGuard, ShutdownSignal};
use crate::value::HostValue;

/// Global the host may set before loading the module.
const CONFIG_GLOBAL: &str = "lilypadBridgeConfig";

type HostClosure = Closure<dyn Fn(Array) -> Result<JsValue, JsValue>>;

impl From<BridgeError> for JsValue {
    fn from(value: BridgeError) -> Self {
        let error = js_sys::Error::new(&value.to_string());
        error.set_name(value.name());
        error.into()
    }
}

impl From<&JsValue> for HostValue {
    fn from(value: &JsValue) -> Self {
        if value.is_undefined() {
            HostValue::Undefined
        } else if value.is_null() {
            HostValue::Null
        } else if let Some(b) = value.as_bool() {
            HostValue::Bool(b)
        } else if let Some(n) = value.as_f64() {
            HostValue::Number(n)
        } else if let Some(s) = value.as_string() {
            HostValue::String(s)
        } else {
            HostValue::Object
        }
    }
}

impl From<HostValue> for JsValue {
    fn from(value: HostValue) -> Self {
        match value {
            HostValue::Undefined | HostValue::Object => JsValue::UNDEFINED,
            HostValue::Null => JsValue::NULL,
            HostValue::Bool(b) => JsValue::from_bool(b),
            HostValue::Number(n) => JsValue::from_f64(n),
            HostValue::String(s) => JsValue::from_str(&s),
        }
    }
}

/// Installs bindings as functions on `globalThis`.
struct JsGlobalNamespace {
    global: Object,
    // dropping a closure invalidates the JS function wrapping it
    closures: HashMap<String, HostClosure>,
    // turns a closure taking an array into a variadic JS function
    spread: Function,
}

impl JsGlobalNamespace {
    fn new() -> Result<Self> {
        let global = js_sys::global();
        if !global.is_object() {
            return Err(BridgeError::NamespaceUnavailable(
                "global object is not available".to_string(),
            ));
        }
        let spread = Function::new_with_args(
            "inner",
            "return function(...args) { return inner(args); };",
        );
        Ok(Self {
            global,
            closures: HashMap::new(),
            spread,
        })
    }

    fn key(name: &str) -> JsValue {
        JsValue::from_str(name)
    }
}

impl HostNamespace for JsGlobalNamespace {
    fn install(&mut self, binding: &Binding) -> Result<()> {
        let name = binding.name();
        let key = Self::key(name);
        let existing = Reflect::has(&self.global, &key).unwrap_or(false);
        if existing && !self.closures.contains_key(name) {
            return Err(BridgeError::ReservedName(name.to_string()));
        }

        let binding = binding.clone();
        let closure: HostClosure = Closure::new(move |args: Array| {
            let args: Vec<HostValue> = args.iter().map(|arg| HostValue::from(&arg)).collect();
            binding
                .call(&args)
                .map(JsValue::from)
                .map_err(JsValue::from)
        });

        let function = self
            .spread
            .call1(&JsValue::NULL, closure.as_ref())
            .map_err(|e| BridgeError::NamespaceUnavailable(format!("{e:?}")))?;
        Reflect::set(&self.global, &key, &function)
            .map_err(|e| BridgeError::NamespaceUnavailable(format!("{e:?}")))?;
        self.closures.insert(name.to_string(), closure);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        Reflect::delete_property(&self.global, &Self::key(name))
            .map_err(|e| BridgeError::NamespaceUnavailable(format!("{e:?}")))?;
        self.closures.remove(name);
        Ok(())
    }
}

struct Resident {
    registrar: Registrar<JsGlobalNamespace>,
    guard: ResidencyGuard,
}

thread_local! {
    static RESIDENT: RefCell<Option<Resident>> = const { RefCell::new(None) };
}

fn load_config() -> Result<BridgeConfig> {
    let value = Reflect::get(&js_sys::global(), &JsValue::from_str(CONFIG_GLOBAL))
        .unwrap_or(JsValue::UNDEFINED);
    if value.is_undefined() || value.is_null() {
        return Ok(BridgeConfig::default());
    }
    let config: BridgeConfig = serde_wasm_bindgen::from_value(value)
        .map_err(|e| BridgeError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Runs when the module is instantiated: register, then stay resident.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let config = load_config()?;
    if console_log::init_with_level(config.level()?).is_err() {
        warn!("Logger already initialized");
    }

    let namespace = JsGlobalNamespace::new()?;
    let mut registrar = Registrar::new(Arc::new(Registry::new()), namespace);
    if let Err(e) = register_defaults(&mut registrar, &config) {
        error!("Registration failed: {e}");
        return Err(e.into());
    }

    let guard = ResidencyGuard::new();
    guard.enter();
    info!(
        "Exported {} with error mode {:?}",
        registrar.registry().names().join(", "),
        config.error_mode
    );
    RESIDENT.with(|resident| *resident.borrow_mut() = Some(Resident { registrar, guard }));
    Ok(())
}

/// Remove every exported binding from `globalThis`. Returns the removed names.
#[wasm_bindgen]
pub fn shutdown() -> Array {
    let removed = RESIDENT.with(|resident| match resident.borrow_mut().as_mut() {
        Some(Resident { registrar, guard }) => guard.release(registrar, ShutdownSignal::Requested),
        None => Vec::new(),
    });
    removed.iter().map(|name| JsValue::from_str(name)).collect()
}

#[wasm_bindgen(js_name = residencyState)]
pub fn residency_state() -> String {
    RESIDENT.with(|resident| match resident.borrow().as_ref() {
        Some(Resident { guard, .. }) => guard.state().to_string(),
        None => "initializing".to_string(),
    })
}

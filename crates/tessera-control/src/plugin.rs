// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Link-time registration of systems.
//!
//! A crate that provides systems can submit a [`SystemPlugin`] with
//! `inventory::submit!`; the host then installs every plugin linked into the
//! binary with [`SystemDispatcher::install_plugins`].
//!
//! ```ignore
//! fn install(dispatcher: &mut SystemDispatcher) {
//!     dispatcher.insert_system(Gravity::default());
//!     dispatcher.enable::<Update, Gravity>(0);
//! }
//!
//! tessera_control::inventory::submit! {
//!     SystemPlugin::new("gravity", install)
//! }
//! ```

use crate::dispatcher::SystemDispatcher;

/// A named installer that adds systems to a dispatcher.
pub struct SystemPlugin {
    name: &'static str,
    install: fn(&mut SystemDispatcher),
}

impl SystemPlugin {
    /// Creates a plugin. Usable in `inventory::submit!`.
    pub const fn new(name: &'static str, install: fn(&mut SystemDispatcher)) -> Self {
        Self { name, install }
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the installer against `dispatcher`.
    pub fn install(&self, dispatcher: &mut SystemDispatcher) {
        (self.install)(dispatcher);
    }
}

inventory::collect!(SystemPlugin);

impl SystemDispatcher {
    /// Installs every submitted [`SystemPlugin`], sorted by name so the
    /// result does not depend on link order. Returns how many ran.
    pub fn install_plugins(&mut self) -> usize {
        let mut plugins: Vec<&SystemPlugin> = inventory::iter::<SystemPlugin>.into_iter().collect();
        plugins.sort_by_key(|plugin| plugin.name);
        for plugin in &plugins {
            log::info!("Installing system plugin `{}`.", plugin.name);
            plugin.install(self);
        }
        plugins.len()
    }
}

impl std::fmt::Debug for SystemPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPlugin").field("name", &self.name).finish()
    }
}

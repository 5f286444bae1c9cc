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

//! The contracts between the dispatcher, its hooks and the systems it drives.

/// A named lifecycle point.
///
/// A hook is a marker type, usually an uninhabited enum. Each hook owns an
/// independent dispatch table, and every handler of a hook receives the same
/// argument type.
pub trait Hook: 'static {
    /// The arguments passed to every handler of this hook.
    type Args<'a>;

    /// A short name used in logs.
    const NAME: &'static str;
}

/// A live object that can be registered with a dispatcher.
pub trait System: 'static {
    /// A human-readable name used in logs and ordering reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Implementation of hook `H` by a system.
pub trait Handler<H: Hook>: System {
    /// Runs this system's part of the lifecycle point.
    fn handle(&mut self, args: &mut H::Args<'_>);
}

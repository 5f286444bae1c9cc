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

use super::component_types::ComponentTypes;
use tessera_core::ecs::TypeMask;

/// A marker trait for types that can be attached to an entity.
///
/// Any `'static` type qualifies; implement it with `#[derive(Component)]`.
pub trait Component: 'static {}

/// A static set of component types, used for multi-type masks and queries.
///
/// Implemented for every [`Component`] and for tuples of up to eight
/// components. Membership checks built from a set use AND semantics.
pub trait ComponentSet: 'static {
    /// Builds the mask for this set, registering any type not yet known.
    ///
    /// # Panics
    ///
    /// Panics if registration would exceed the registry's type capacity.
    fn register_mask(types: &mut ComponentTypes) -> TypeMask;

    /// Builds the mask for this set, or `None` if any member was never
    /// registered.
    fn lookup_mask(types: &ComponentTypes) -> Option<TypeMask>;
}

impl<T: Component> ComponentSet for T {
    fn register_mask(types: &mut ComponentTypes) -> TypeMask {
        let mut mask = TypeMask::new();
        mask.insert(types.register::<T>());
        mask
    }

    fn lookup_mask(types: &ComponentTypes) -> Option<TypeMask> {
        let mut mask = TypeMask::new();
        mask.insert(types.index_of::<T>()?);
        Some(mask)
    }
}

macro_rules! impl_component_set_for_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn register_mask(types: &mut ComponentTypes) -> TypeMask {
                let mut mask = TypeMask::new();
                $( mask.insert(types.register::<$ty>()); )+
                mask
            }

            fn lookup_mask(types: &ComponentTypes) -> Option<TypeMask> {
                let mut mask = TypeMask::new();
                $( mask.insert(types.index_of::<$ty>()?); )+
                Some(mask)
            }
        }
    };
}

impl_component_set_for_tuple!(A);
impl_component_set_for_tuple!(A, B);
impl_component_set_for_tuple!(A, B, C);
impl_component_set_for_tuple!(A, B, C, D);
impl_component_set_for_tuple!(A, B, C, D, E);
impl_component_set_for_tuple!(A, B, C, D, E, F);
impl_component_set_for_tuple!(A, B, C, D, E, F, G);
impl_component_set_for_tuple!(A, B, C, D, E, F, G, H);

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

use std::alloc::{self, Layout};
use std::any::{type_name, TypeId};
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

unsafe fn drop_erased<T>(ptr: *mut u8) {
    ptr::drop_in_place(ptr.cast::<T>());
}

/// Type-erased, chunk-allocated storage for one component type.
///
/// Element `i` lives in chunk `i / elements_per_chunk` at byte offset
/// `(i % elements_per_chunk) * element_size`. Chunks are allocated on demand,
/// never move and are only freed when the pool itself is dropped.
///
/// The pool does not track which slots hold a value. Callers decide liveness
/// (the registry uses each entity's type mask) and must pair every
/// [`insert`](Self::insert) with an [`erase`](Self::erase) before the pool is
/// dropped, or the value leaks.
pub struct ChunkedPool {
    type_id: TypeId,
    type_name: &'static str,
    element_size: usize,
    per_chunk: usize,
    chunk_layout: Layout,
    drop_fn: Option<unsafe fn(*mut u8)>,
    dangling: NonNull<u8>,
    chunks: Vec<NonNull<u8>>,
}

impl ChunkedPool {
    /// Creates an empty pool for `T` with chunks of roughly `chunk_size` bytes.
    ///
    /// A chunk always holds at least one element, even when `T` is larger
    /// than `chunk_size`.
    pub fn new<T: 'static>(chunk_size: usize) -> Self {
        let element_size = mem::size_of::<T>();
        let per_chunk = if element_size == 0 {
            chunk_size.max(1)
        } else {
            (chunk_size / element_size).max(1)
        };
        let chunk_layout = match Layout::array::<T>(per_chunk) {
            Ok(layout) => layout,
            Err(e) => panic!(
                "cannot lay out a chunk of {per_chunk} `{}`: {e}",
                type_name::<T>()
            ),
        };

        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            element_size,
            per_chunk,
            chunk_layout,
            drop_fn: if mem::needs_drop::<T>() {
                Some(drop_erased::<T> as unsafe fn(*mut u8))
            } else {
                None
            },
            dangling: NonNull::<T>::dangling().cast(),
            chunks: Vec::new(),
        }
    }

    /// Returns the name of the stored type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the pool stores values of type `T`.
    pub fn holds<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns the size in bytes of one element.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Returns how many elements fit in one chunk.
    pub fn elements_per_chunk(&self) -> usize {
        self.per_chunk
    }

    /// Returns the number of chunks allocated so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the number of indices backed by storage.
    pub fn capacity(&self) -> usize {
        if self.element_size == 0 {
            usize::MAX
        } else {
            self.chunks.len() * self.per_chunk
        }
    }

    /// Returns the number of bytes held by allocated chunks.
    pub fn allocated_bytes(&self) -> usize {
        self.chunks.len() * self.chunk_layout.size()
    }

    /// Ensures storage exists for `index` and every index below it.
    pub fn reserve(&mut self, index: usize) {
        if self.element_size == 0 {
            return;
        }
        let needed = index / self.per_chunk + 1;
        if self.chunks.len() >= needed {
            return;
        }
        self.chunks.reserve(needed - self.chunks.len());
        while self.chunks.len() < needed {
            // SAFETY: `chunk_layout` has a non-zero size for non-zero-sized types.
            let raw = unsafe { alloc::alloc(self.chunk_layout) };
            let Some(chunk) = NonNull::new(raw) else {
                alloc::handle_alloc_error(self.chunk_layout);
            };
            self.chunks.push(chunk);
        }
        log::trace!(
            "Pool `{}` grew to {} chunk(s).",
            self.type_name,
            self.chunks.len()
        );
    }

    fn slot_ptr(&self, index: usize) -> *mut u8 {
        if self.element_size == 0 {
            return self.dangling.as_ptr();
        }
        let chunk = self.chunks[index / self.per_chunk];
        // SAFETY: the offset stays inside the chunk allocation.
        unsafe {
            chunk
                .as_ptr()
                .add((index % self.per_chunk) * self.element_size)
        }
    }

    /// Returns a reference to the value at `index`.
    ///
    /// # Safety
    ///
    /// The pool must hold `T`, and a value must have been inserted at `index`
    /// and not erased since.
    pub unsafe fn get<T: 'static>(&self, index: usize) -> &T {
        debug_assert!(self.holds::<T>(), "pool of `{}` read as `{}`", self.type_name, type_name::<T>());
        &*self.slot_ptr(index).cast::<T>()
    }

    /// Returns a mutable reference to the value at `index`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`get`](Self::get).
    pub unsafe fn get_mut<T: 'static>(&mut self, index: usize) -> &mut T {
        debug_assert!(self.holds::<T>(), "pool of `{}` read as `{}`", self.type_name, type_name::<T>());
        &mut *self.slot_ptr(index).cast::<T>()
    }

    /// Reserves `index` and moves `value` into it.
    ///
    /// # Safety
    ///
    /// The pool must hold `T` and the slot at `index` must be empty; a live
    /// value there would be overwritten without being dropped.
    pub unsafe fn insert<T: 'static>(&mut self, index: usize, value: T) -> &mut T {
        debug_assert!(self.holds::<T>(), "pool of `{}` written as `{}`", self.type_name, type_name::<T>());
        self.reserve(index);
        let slot = self.slot_ptr(index).cast::<T>();
        slot.write(value);
        &mut *slot
    }

    /// Drops the value at `index` in place. Chunk memory is kept.
    ///
    /// # Safety
    ///
    /// A value must have been inserted at `index` and not erased since.
    pub unsafe fn erase(&mut self, index: usize) {
        if let Some(drop_fn) = self.drop_fn {
            drop_fn(self.slot_ptr(index));
        }
    }
}

impl Drop for ChunkedPool {
    fn drop(&mut self) {
        for chunk in self.chunks.drain(..) {
            // SAFETY: every chunk was allocated with `chunk_layout`.
            unsafe { alloc::dealloc(chunk.as_ptr(), self.chunk_layout) };
        }
    }
}

impl fmt::Debug for ChunkedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedPool")
            .field("type", &self.type_name)
            .field("element_size", &self.element_size)
            .field("elements_per_chunk", &self.per_chunk)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn insert_then_read_back() {
        let mut pool = ChunkedPool::new::<Position>(64);
        unsafe {
            pool.insert(3, Position { x: 1.0, y: 2.0 });
            pool.insert(0, Position { x: 5.0, y: 6.0 });
            assert_eq!(pool.get::<Position>(3), &Position { x: 1.0, y: 2.0 });
            pool.get_mut::<Position>(0).x = 9.0;
            assert_eq!(pool.get::<Position>(0).x, 9.0);
        }
    }

    #[test]
    fn reserve_allocates_whole_chunks_transitively() {
        let mut pool = ChunkedPool::new::<u64>(64);
        assert_eq!(pool.elements_per_chunk(), 8);
        assert_eq!(pool.chunk_count(), 0);

        pool.reserve(20);
        assert_eq!(pool.chunk_count(), 3);
        assert_eq!(pool.capacity(), 24);
        assert_eq!(pool.allocated_bytes(), 3 * 64);

        pool.reserve(5);
        assert_eq!(pool.chunk_count(), 3);
    }

    #[test]
    fn oversized_elements_get_one_per_chunk() {
        let pool = ChunkedPool::new::<[u8; 100]>(16);
        assert_eq!(pool.elements_per_chunk(), 1);
    }

    #[test]
    fn values_do_not_move_when_pool_grows() {
        let mut pool = ChunkedPool::new::<u32>(16);
        let first = unsafe { pool.insert(0, 7u32) as *const u32 };
        pool.reserve(1000);
        let again = unsafe { pool.get::<u32>(0) as *const u32 };
        assert_eq!(first, again);
    }

    #[test]
    fn erase_drops_exactly_once() {
        let token = Rc::new(());
        let mut pool = ChunkedPool::new::<Rc<()>>(128);
        unsafe {
            pool.insert(0, Rc::clone(&token));
            pool.insert(1, Rc::clone(&token));
        }
        assert_eq!(Rc::strong_count(&token), 3);
        unsafe { pool.erase(0) };
        assert_eq!(Rc::strong_count(&token), 2);
        unsafe { pool.erase(1) };
        assert_eq!(Rc::strong_count(&token), 1);
        assert_eq!(pool.chunk_count(), 1);
    }

    #[test]
    fn over_aligned_values_are_aligned() {
        #[repr(align(64))]
        struct Wide(#[allow(dead_code)] u8);

        let mut pool = ChunkedPool::new::<Wide>(256);
        for index in 0..10 {
            let ptr = unsafe { pool.insert(index, Wide(index as u8)) as *const Wide };
            assert_eq!(ptr as usize % 64, 0);
        }
    }

    #[test]
    fn zero_sized_types_never_allocate() {
        struct Tag;
        let mut pool = ChunkedPool::new::<Tag>(64);
        unsafe {
            pool.insert(10_000, Tag);
            let _ = pool.get::<Tag>(10_000);
            pool.erase(10_000);
        }
        assert_eq!(pool.chunk_count(), 0);
        assert_eq!(pool.allocated_bytes(), 0);
    }
}

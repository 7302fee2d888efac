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

//! # Vesper Infra
//!
//! Concrete implementations of the [`GraphicsBackend`](vesper_core::renderer::GraphicsBackend)
//! contract.
//!
//! Two backends are provided. [`ExplicitBackend`] models an explicit API: it
//! tracks image layouts and records barriers, waits on per-frame fences and
//! allocates descriptor sets from fixed-size pools. [`ImmediateBackend`] models a
//! GL-style API where layouts do not exist and descriptor pools are an unbounded
//! registry. Both are headless: every recorded command is kept and can be
//! inspected after submission, and buffer contents can be read back.

pub mod graphics;

pub use graphics::{
    create_backend, ExplicitBackend, HeadlessBackend, HeadlessConfig, ImmediateBackend,
    RecordedCommand, Submission,
};

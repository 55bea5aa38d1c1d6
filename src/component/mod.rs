//! Logic components and everything attached to their ports.
//!
//! A component owns its port levels, its wires and a pure logic function.
//! It never reaches into another component; wires name their peers by
//! [`ComponentId`] and the [`Circuit`](crate::circuit::Circuit) resolves
//! them.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`ComponentId`] newtype |
//! | [`level`] | [`Level`] tri-state signal |
//! | [`connection`] | [`InboundConnection`], [`OutboundConnection`] |
//! | [`props`] | [`ComponentTemplate`], [`PropertyValue`], [`PortBounds`] |
//! | [`record`] | [`ComponentRecord`], [`Propagate`], [`RecordLog`] |
//! | [`instance`] | [`Component`], [`ComponentBuilder`] |
//! | [`builtin`] | gate templates and the interconnect |

pub mod builtin;
pub mod connection;
pub mod id;
pub mod instance;
pub mod level;
pub mod props;
pub mod record;

pub use connection::{InboundConnection, OutboundConnection};
pub use id::ComponentId;
pub use instance::{Component, ComponentBuilder};
pub(crate) use instance::Severed;
pub use level::Level;
pub use props::{ComponentTemplate, LogicFn, PortBounds, Properties, PropertyValue};
pub use record::{ComponentRecord, Detached, Propagate, RecordLog};

// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device-identification value types shared by the prober and the mount-table model.

// From dependency library

// From standard library

// From this library
pub use device_number_struct::DeviceNumber;
pub use label_struct::Label;
pub use tag_name_struct::TagName;
pub use tag_struct::Tag;
pub use usage_enum::Usage;
pub use uuid_struct::Uuid;

mod device_number_struct;
mod label_struct;
mod tag_name_struct;
mod tag_struct;
mod usage_enum;
mod uuid_struct;

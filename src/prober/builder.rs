// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builder for [`Prober`].

// From dependency library
use typed_builder::TypedBuilder;

// From standard library
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

// From this library
use crate::config::Config;
use crate::prober::chain::ChainId;
use crate::prober::error::{ProbeBuilderError, ProbeError};
use crate::prober::filter::FilterCriterion;
use crate::prober::probe_struct::{device_size, Prober};

#[derive(Debug, TypedBuilder)]
#[builder(builder_type(name = ProberBuilder, vis = "pub", doc = "Configures and creates a new [`Prober`] instance.\n\nFor usage, see [`ProberBuilder::build`] or [`Prober::builder`]."),
    build_method(vis = "", name = __build))]
pub(crate) struct PrbBuilder {
    #[builder(
        default,
        setter(into, strip_option),
        setter(doc = "Sets the path to the device to associate with a [`Prober`].")
    )]
    scan_device: Option<PathBuf>,

    #[builder(
        default,
        setter(
            strip_option,
            doc = "Sets an already-open [`File`] as the device to associate with a [`Prober`]."
        )
    )]
    scan_file: Option<File>,

    #[builder(
        setter(strip_bool),
        setter(doc = "Opens the device in read/write mode. Required for a non-dry-run `do_wipe`.")
    )]
    allow_writes: bool,

    #[builder(
        default = 512,
        setter(doc = "Sets the number of bytes per sector on the device.")
    )]
    bytes_per_sector: u32,

    #[builder(default = (0, 0),
        setter(transform = |location: u64, size: u64| (location, size),
        doc = "Sets the region to scan on the device. A `size` of `0` means the whole device."))]
    scan_device_segment: (u64, u64),

    #[builder(
        default = true,
        setter(doc = "Deactivates the superblocks chain when set to `false`. Enabled by default.")
    )]
    scan_device_superblocks: bool,

    #[builder(default = None, setter(transform = |criterion: FilterCriterion, names: Vec<&'static str>| Some((criterion, names)),
        doc = "Restricts the superblocks chain to, or away from, the named descriptors."))]
    scan_superblocks_for_file_systems: Option<(FilterCriterion, Vec<&'static str>)>,

    #[builder(
        default = false,
        setter(doc = "Activates the partitions chain when set to `true`. Disabled by default.")
    )]
    scan_device_partitions: bool,

    #[builder(default = None, setter(transform = |criterion: FilterCriterion, names: Vec<&'static str>| Some((criterion, names)),
        doc = "Restricts the partitions chain to, or away from, the named descriptors."))]
    scan_partitions_for_partition_tables: Option<(FilterCriterion, Vec<&'static str>)>,

    #[builder(
        default = false,
        setter(doc = "Activates the topology chain when set to `true`. Disabled by default.")
    )]
    scan_device_topology: bool,

    #[builder(
        default,
        setter(
            strip_option,
            doc = "Uses a pre-loaded configuration snapshot instead of reading one from disk."
        )
    )]
    config: Option<Arc<Config>>,
}

#[allow(non_camel_case_types)]
impl<
        __scan_device: ::typed_builder::Optional<Option<PathBuf>>,
        __scan_file: ::typed_builder::Optional<Option<File>>,
        __allow_writes: ::typed_builder::Optional<bool>,
        __bytes_per_sector: ::typed_builder::Optional<u32>,
        __scan_device_segment: ::typed_builder::Optional<(u64, u64)>,
        __scan_device_superblocks: ::typed_builder::Optional<bool>,
        __scan_superblocks_for_file_systems: ::typed_builder::Optional<Option<(FilterCriterion, Vec<&'static str>)>>,
        __scan_device_partitions: ::typed_builder::Optional<bool>,
        __scan_partitions_for_partition_tables: ::typed_builder::Optional<Option<(FilterCriterion, Vec<&'static str>)>>,
        __scan_device_topology: ::typed_builder::Optional<bool>,
        __config: ::typed_builder::Optional<Option<Arc<Config>>>,
    >
    ProberBuilder<(
        __scan_device,
        __scan_file,
        __allow_writes,
        __bytes_per_sector,
        __scan_device_segment,
        __scan_device_superblocks,
        __scan_superblocks_for_file_systems,
        __scan_device_partitions,
        __scan_partitions_for_partition_tables,
        __scan_device_topology,
        __config,
    )>
{
    /// Finishes configuring, and creates a new [`Prober`] instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use diskid::prober::Prober;
    ///
    /// fn main() -> diskid::Result<()> {
    ///     let mut prober = Prober::builder()
    ///         .scan_device("/dev/null")
    ///         .build()?;
    ///
    ///     let _ = prober.do_safeprobe();
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn build(self) -> Result<Prober, ProbeBuilderError> {
        let builder = self.__build();

        let config = match builder.config {
            Some(config) => config,
            None => Config::read().map_err(|e| ProbeBuilderError::Required(e.to_string()))?,
        };

        let (offset, segment_size) = builder.scan_device_segment;

        let mut prober = match (builder.scan_device, builder.scan_file) {
            (None, None) => {
                return Err(ProbeBuilderError::Required(
                    "one of `scan_device` or `scan_file` must be set".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ProbeBuilderError::MutuallyExclusive(
                    "can not set `scan_device` and `scan_file` simultaneously".to_string(),
                ))
            }
            (Some(path), None) => {
                let file = if builder.allow_writes {
                    File::options().read(true).write(true).open(&path)
                } else {
                    File::open(&path)
                }
                .map_err(ProbeError::from)?;

                let size = if segment_size == 0 {
                    device_size(&file).map_err(ProbeError::from)?.saturating_sub(offset).max(1)
                } else {
                    segment_size
                };
                Prober::from_file(file, builder.allow_writes, offset, size, builder.bytes_per_sector, config)
            }
            (None, Some(file)) => {
                let size = if segment_size == 0 {
                    device_size(&file).map_err(ProbeError::from)?.saturating_sub(offset).max(1)
                } else {
                    segment_size
                };
                Prober::from_file(file, builder.allow_writes, offset, size, builder.bytes_per_sector, config)
            }
        }
        .map_err(ProbeBuilderError::from)?;

        prober.set_chain_enabled(ChainId::Superblocks, builder.scan_device_superblocks);
        if let Some((criterion, names)) = builder.scan_superblocks_for_file_systems {
            prober.filter_types(ChainId::Superblocks, criterion, &names);
        }

        prober.set_chain_enabled(ChainId::Partitions, builder.scan_device_partitions);
        if let Some((criterion, names)) = builder.scan_partitions_for_partition_tables {
            prober.filter_types(ChainId::Partitions, criterion, &names);
        }

        prober.set_chain_enabled(ChainId::Topology, builder.scan_device_topology);

        Ok(prober)
    }
}

impl Prober {
    /// Starts building a [`Prober`].
    #[allow(clippy::type_complexity)]
    pub fn builder() -> ProberBuilder<((), (), (), (), (), (), (), (), (), (), ())> {
        PrbBuilder::builder()
    }
}

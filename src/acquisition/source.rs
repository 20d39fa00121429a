//! Image source adapters.
//!
//! A source serves the full disk for a target instant as a `grid`×`grid`
//! mosaic of tiles (a grid of 1 is a single image). [`TemplateSource`]
//! addresses tiles through a template such as
//!
//! ```text
//! https://example.org/{grid}d/550/{year}/{month}/{day}/{hour}{minute}00_{col}_{row}.png
//! /srv/mirror/{year}{month}{day}/{hour}{minute}.png
//! ```
//!
//! and fetches them over HTTP(S) or from the local filesystem. [`fetch_raster`]
//! downloads every tile with bounded parallelism, validates and stitches them.

use anyhow::{Context, Result};
use image::{RgbaImage, imageops};
use rayon::prelude::*;
use std::time::Duration;

use crate::cache::AcquisitionTarget;
use crate::common::constants::MINIMUM_SOURCE_SIZE;
use crate::error::{AttemptError, FetchError, ValidationError};
use crate::imaging::RawDiskImage;

/// Position of a tile in the source mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub col: u32,
    pub row: u32,
}

/// Where raw disk images come from.
#[cfg_attr(test, mockall::automock)]
pub trait ImageSource: Send + Sync {
    /// Tiles per side of the mosaic.
    fn grid(&self) -> u32;

    /// Encoded bytes of one tile.
    fn fetch_tile(&self, target: &AcquisitionTarget, tile: Tile) -> Result<Vec<u8>, FetchError>;
}

/// Template-addressed source over HTTP(S), `file://` URLs or plain paths.
pub struct TemplateSource {
    template: String,
    grid: u32,
    client: Option<reqwest::blocking::Client>,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>, grid: u32, timeout: Duration) -> Result<Self> {
        let template = template.into();
        let client = if is_remote(&template) {
            Some(
                reqwest::blocking::Client::builder()
                    .timeout(timeout)
                    .user_agent(concat!("earthpaper/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .context("Failed to build HTTP client")?,
            )
        } else {
            None
        };
        Ok(Self {
            template,
            grid,
            client,
        })
    }

    /// The resource address of one tile.
    pub fn resolve(&self, target: &AcquisitionTarget, tile: Tile) -> String {
        let instant = target.instant;
        self.template
            .replace("{grid}", &self.grid.to_string())
            .replace("{year}", &instant.format("%Y").to_string())
            .replace("{month}", &instant.format("%m").to_string())
            .replace("{day}", &instant.format("%d").to_string())
            .replace("{hour}", &instant.format("%H").to_string())
            .replace("{minute}", &instant.format("%M").to_string())
            .replace("{col}", &tile.col.to_string())
            .replace("{row}", &tile.row.to_string())
    }

    fn fetch_remote(
        &self,
        client: &reqwest::blocking::Client,
        resource: String,
    ) -> Result<Vec<u8>, FetchError> {
        let response = client
            .get(&resource)
            .send()
            .map_err(|e| transport_error(&resource, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { resource });
        }
        if !status.is_success() {
            return Err(FetchError::Protocol {
                resource,
                message: format!("HTTP {status}"),
            });
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| transport_error(&resource, e))
    }

    fn fetch_local(&self, resource: String) -> Result<Vec<u8>, FetchError> {
        let path = resource.strip_prefix("file://").unwrap_or(&resource);
        std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound { resource }
            } else {
                FetchError::Io { resource, source }
            }
        })
    }
}

impl ImageSource for TemplateSource {
    fn grid(&self) -> u32 {
        self.grid
    }

    fn fetch_tile(&self, target: &AcquisitionTarget, tile: Tile) -> Result<Vec<u8>, FetchError> {
        let resource = self.resolve(target, tile);
        match &self.client {
            Some(client) => self.fetch_remote(client, resource),
            None => self.fetch_local(resource),
        }
    }
}

fn is_remote(template: &str) -> bool {
    template.starts_with("http://") || template.starts_with("https://")
}

fn transport_error(resource: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            resource: resource.to_string(),
        }
    } else {
        FetchError::Protocol {
            resource: resource.to_string(),
            message: error.to_string(),
        }
    }
}

/// Fetch, decode, validate and stitch all tiles of `target`.
///
/// Tiles are downloaded on `pool`, whose size bounds the parallelism. Any
/// failing tile fails the whole attempt.
pub fn fetch_raster(
    source: &dyn ImageSource,
    target: &AcquisitionTarget,
    pool: &rayon::ThreadPool,
) -> Result<RawDiskImage, AttemptError> {
    let grid = source.grid().max(1);
    let tiles: Vec<Tile> = (0..grid)
        .flat_map(|row| (0..grid).map(move |col| Tile { col, row }))
        .collect();

    let decoded: Vec<(Tile, RgbaImage)> = pool.install(|| {
        tiles
            .par_iter()
            .map(|&tile| -> Result<(Tile, RgbaImage), AttemptError> {
                let bytes = source.fetch_tile(target, tile)?;
                let image = image::load_from_memory(&bytes)
                    .map_err(|source| ValidationError::Decode {
                        col: tile.col,
                        row: tile.row,
                        source,
                    })?
                    .to_rgba8();
                Ok((tile, image))
            })
            .collect::<Result<Vec<_>, AttemptError>>()
    })?;

    stitch(grid, decoded)
}

fn stitch(grid: u32, tiles: Vec<(Tile, RgbaImage)>) -> Result<RawDiskImage, AttemptError> {
    let Some((tile_width, tile_height)) = tiles.first().map(|(_, image)| image.dimensions())
    else {
        return Err(ValidationError::TooSmall {
            size: 0,
            minimum: MINIMUM_SOURCE_SIZE,
        }
        .into());
    };

    for (tile, image) in &tiles {
        let (width, height) = image.dimensions();
        if (width, height) != (tile_width, tile_height) {
            return Err(ValidationError::TileMismatch {
                col: tile.col,
                row: tile.row,
                width,
                height,
                expected_width: tile_width,
                expected_height: tile_height,
            }
            .into());
        }
    }

    let (width, height) = (tile_width * grid, tile_height * grid);
    if width != height {
        return Err(ValidationError::NotSquare { width, height }.into());
    }
    if width < MINIMUM_SOURCE_SIZE {
        return Err(ValidationError::TooSmall {
            size: width,
            minimum: MINIMUM_SOURCE_SIZE,
        }
        .into());
    }

    if grid == 1 {
        return Ok(tiles.into_iter().map(|(_, image)| image).next().unwrap_or_default());
    }

    let mut raster = RgbaImage::new(width, height);
    for (tile, image) in &tiles {
        imageops::replace(
            &mut raster,
            image,
            (tile.col * tile_width) as i64,
            (tile.row * tile_height) as i64,
        );
    }
    Ok(raster)
}

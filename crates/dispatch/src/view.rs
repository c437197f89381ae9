//! # Live View Composer
//!
//! Turns the live store into map markers and a viewport. Bounds are
//! recomputed in full on every store revision or filter change.

use std::collections::{BTreeMap, BTreeSet};

use realtime::{Coordinates, DeliveryId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parcel::{LiveParcel, ParcelStatus};
use crate::store::LiveState;

const DEFAULT_CENTER: Coordinates = Coordinates::new(23.8103, 90.4125);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Shown when there is nothing to fit.
    pub default_center: Coordinates,
    pub default_zoom: u8,

    /// Fraction of the marker span added on each side.
    pub padding_ratio: f64,

    /// Smallest span, in degrees, that bounds are fitted to.
    pub min_span_degrees: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_center: DEFAULT_CENTER,
            default_zoom: 12,
            padding_ratio: 0.1,
            min_span_degrees: 0.005,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }

    #[must_use]
    pub const fn center(&self) -> Coordinates {
        Coordinates::new(
            f64::midpoint(self.south_west.lat, self.north_east.lat),
            f64::midpoint(self.south_west.lng, self.north_east.lng),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Viewport {
    Fit(Bounds),
    Center { center: Coordinates, zoom: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub delivery_id: DeliveryId,
    pub position: Coordinates,
    pub status: ParcelStatus,

    /// Tracking number when known, otherwise the delivery id.
    pub label: String,
}

impl Marker {
    fn from_parcel(parcel: &LiveParcel) -> Option<Self> {
        let position = parcel.last_coordinates.filter(Coordinates::is_valid)?;
        let label =
            parcel.tracking_number.clone().unwrap_or_else(|| parcel.delivery_id.to_string());
        let delivery_id = parcel.delivery_id.clone();
        Some(Self { delivery_id, position, status: parcel.status, label })
    }
}

/// Changes against the previously rendered marker set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDiff {
    pub added: Vec<Marker>,

    /// Markers that stayed but changed position, status or label.
    pub moved: Vec<Marker>,

    pub removed: Vec<DeliveryId>,
}

impl MarkerDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.moved.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LiveView {
    config: ViewConfig,
    filter: BTreeSet<ParcelStatus>,
    markers: BTreeMap<DeliveryId, Marker>,
    viewport: Viewport,
    revision: Option<u64>,
}

impl Default for LiveView {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

impl LiveView {
    /// A view showing active parcels.
    #[must_use]
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            filter: ParcelStatus::ACTIVE.into_iter().collect(),
            markers: BTreeMap::new(),
            viewport: default_viewport(&config),
            revision: None,
        }
    }

    /// Restrict markers to `statuses`. An empty set shows every parcel.
    pub fn set_filter(&mut self, statuses: impl IntoIterator<Item = ParcelStatus>) {
        let filter: BTreeSet<_> = statuses.into_iter().collect();
        if filter != self.filter {
            self.filter = filter;
            self.revision = None;
        }
    }

    #[must_use]
    pub const fn filter(&self) -> &BTreeSet<ParcelStatus> {
        &self.filter
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Recompose from `state`. Returns `None` when neither the store
    /// revision nor the filter changed since the last call.
    pub fn refresh(&mut self, state: &LiveState) -> Option<MarkerDiff> {
        if self.revision == Some(state.revision()) {
            return None;
        }
        self.revision = Some(state.revision());

        let next: BTreeMap<_, _> = state
            .parcels()
            .filter(|parcel| self.filter.is_empty() || self.filter.contains(&parcel.status))
            .filter_map(Marker::from_parcel)
            .map(|marker| (marker.delivery_id.clone(), marker))
            .collect();

        let mut diff = MarkerDiff::default();
        for (id, marker) in &next {
            match self.markers.get(id) {
                None => diff.added.push(marker.clone()),
                Some(previous) if previous != marker => diff.moved.push(marker.clone()),
                Some(_) => {}
            }
        }
        diff.removed =
            self.markers.keys().filter(|id| !next.contains_key(*id)).cloned().collect();

        self.markers = next;
        let positions: Vec<_> = self.markers.values().map(|marker| marker.position).collect();
        self.viewport = fit(&positions, &self.config)
            .map_or_else(|| default_viewport(&self.config), Viewport::Fit);

        debug!(
            markers = self.markers.len(), added = diff.added.len(), moved = diff.moved.len(),
            removed = diff.removed.len(), "live view refreshed"
        );
        Some(diff)
    }
}

const fn default_viewport(config: &ViewConfig) -> Viewport {
    Viewport::Center { center: config.default_center, zoom: config.default_zoom }
}

/// Padded bounds around `points`, or `None` when there are none.
#[must_use]
pub fn fit(points: &[Coordinates], config: &ViewConfig) -> Option<Bounds> {
    let first = points.first()?;
    let (mut south, mut west, mut north, mut east) = (first.lat, first.lng, first.lat, first.lng);
    for point in &points[1..] {
        south = south.min(point.lat);
        north = north.max(point.lat);
        west = west.min(point.lng);
        east = east.max(point.lng);
    }

    let (south, north) = widen(south, north, config);
    let (west, east) = widen(west, east, config);

    Some(Bounds {
        south_west: Coordinates::new(south.max(-90.0), west.max(-180.0)),
        north_east: Coordinates::new(north.min(90.0), east.min(180.0)),
    })
}

// grow to the minimum span around the midpoint, then pad each side
fn widen(low: f64, high: f64, config: &ViewConfig) -> (f64, f64) {
    let span = high - low;
    let (low, high) = if span < config.min_span_degrees {
        let half = config.min_span_degrees / 2.0;
        let mid = f64::midpoint(low, high);
        (mid - half, mid + half)
    } else {
        (low, high)
    };
    let pad = (high - low) * config.padding_ratio;
    (low - pad, high + pad)
}

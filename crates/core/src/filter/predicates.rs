use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::criteria::{all_present, any_equal, any_keyword_in, contains_ignore_case, highest_number, NumericRange};
use super::{retain, Predicate, RecordFilter};
use crate::error::{SearchError, SearchResult};
use crate::payload::{
    EventResult, EventsPayload, FinancePayload, FlightOffer, FlightsPayload, ForecastPeriod,
    HotelProperty, HotelsPayload, MarketQuote, WeatherPayload,
};
use crate::types::SearchId;

// Flights

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightPriceFilter {
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

impl Predicate<FlightOffer> for FlightPriceFilter {
    fn matches(&self, offer: &FlightOffer) -> bool {
        NumericRange::new(self.min_price, self.max_price).contains(offer.price_or_zero())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirlineFilter {
    #[serde(default)]
    pub airlines: Vec<String>,
}

impl Predicate<FlightOffer> for AirlineFilter {
    fn matches(&self, offer: &FlightOffer) -> bool {
        any_equal(&self.airlines, offer.airlines())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlightMatches {
    pub filtered_best_flights: Vec<FlightOffer>,
    pub filtered_other_flights: Vec<FlightOffer>,
}

fn filter_flights<P: Predicate<FlightOffer>>(predicate: &P, payload: &FlightsPayload) -> (FlightMatches, usize) {
    let matches = FlightMatches {
        filtered_best_flights: retain(&payload.best_flights, predicate),
        filtered_other_flights: retain(&payload.other_flights, predicate),
    };
    let total = matches.filtered_best_flights.len() + matches.filtered_other_flights.len();
    (matches, total)
}

impl RecordFilter for FlightPriceFilter {
    type Payload = FlightsPayload;
    type Output = FlightMatches;

    fn apply(&self, _id: &SearchId, payload: &FlightsPayload) -> SearchResult<(FlightMatches, usize)> {
        Ok(filter_flights(self, payload))
    }
}

impl RecordFilter for AirlineFilter {
    type Payload = FlightsPayload;
    type Output = FlightMatches;

    fn apply(&self, _id: &SearchId, payload: &FlightsPayload) -> SearchResult<(FlightMatches, usize)> {
        Ok(filter_flights(self, payload))
    }
}

// Hotels

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelPriceFilter {
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

impl Predicate<HotelProperty> for HotelPriceFilter {
    fn matches(&self, property: &HotelProperty) -> bool {
        NumericRange::new(self.min_price, self.max_price)
            .contains(property.nightly_rate().unwrap_or(0.0))
    }
}

fn default_min_rating() -> f64 {
    4.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingFilter {
    #[serde(default = "default_min_rating")]
    pub min_rating: f64,
}

impl Default for RatingFilter {
    fn default() -> Self {
        Self {
            min_rating: default_min_rating(),
        }
    }
}

impl Predicate<HotelProperty> for RatingFilter {
    fn matches(&self, property: &HotelProperty) -> bool {
        property.rating().unwrap_or(0.0) >= self.min_rating
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmenityFilter {
    #[serde(default)]
    pub required_amenities: Vec<String>,
}

impl Predicate<HotelProperty> for AmenityFilter {
    fn matches(&self, property: &HotelProperty) -> bool {
        all_present(&self.required_amenities, &property.amenities)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelClassFilter {
    #[serde(default)]
    pub hotel_classes: Vec<i64>,
}

impl Predicate<HotelProperty> for HotelClassFilter {
    fn matches(&self, property: &HotelProperty) -> bool {
        self.hotel_classes.is_empty()
            || self.hotel_classes.contains(&property.class().unwrap_or(0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HotelMatches {
    pub filtered_properties: Vec<HotelProperty>,
}

macro_rules! hotel_filter {
    ($filter:ty) => {
        impl RecordFilter for $filter {
            type Payload = HotelsPayload;
            type Output = HotelMatches;

            fn apply(&self, _id: &SearchId, payload: &HotelsPayload) -> SearchResult<(HotelMatches, usize)> {
                let filtered_properties = retain(&payload.properties, self);
                let total = filtered_properties.len();
                Ok((HotelMatches { filtered_properties }, total))
            }
        }
    };
}

hotel_filter!(HotelPriceFilter);
hotel_filter!(RatingFilter);
hotel_filter!(AmenityFilter);
hotel_filter!(HotelClassFilter);

// Events

/// Both criteria must hold when both are given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDateFilter {
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub specific_date: Option<String>,
}

impl Predicate<EventResult> for EventDateFilter {
    fn matches(&self, event: &EventResult) -> bool {
        let when = event.when().unwrap_or("");
        [&self.date_range, &self.specific_date]
            .into_iter()
            .flatten()
            .all(|needle| contains_ignore_case(when, needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTypeFilter {
    #[serde(default)]
    pub event_types: Vec<String>,
}

impl Predicate<EventResult> for EventTypeFilter {
    fn matches(&self, event: &EventResult) -> bool {
        any_keyword_in(
            &self.event_types,
            &[event.title.as_deref(), event.description.as_deref()],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueFilter {
    #[serde(default)]
    pub venue_names: Vec<String>,
}

impl Predicate<EventResult> for VenueFilter {
    fn matches(&self, event: &EventResult) -> bool {
        any_keyword_in(&self.venue_names, &[event.venue_name()])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventMatches {
    pub filtered_events: Vec<EventResult>,
}

macro_rules! event_filter {
    ($filter:ty) => {
        impl RecordFilter for $filter {
            type Payload = EventsPayload;
            type Output = EventMatches;

            fn apply(&self, _id: &SearchId, payload: &EventsPayload) -> SearchResult<(EventMatches, usize)> {
                let filtered_events = retain(&payload.events_results, self);
                let total = filtered_events.len();
                Ok((EventMatches { filtered_events }, total))
            }
        }
    };
}

event_filter!(EventDateFilter);
event_filter!(EventTypeFilter);
event_filter!(VenueFilter);

// Finance

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementFilter {
    #[serde(default)]
    pub min_percentage: Option<f64>,
    #[serde(default)]
    pub max_percentage: Option<f64>,
    /// `Up` or `Down`, matched exactly
    #[serde(default)]
    pub movement_type: Option<String>,
}

impl Predicate<MarketQuote> for MovementFilter {
    fn matches(&self, quote: &MarketQuote) -> bool {
        let in_range = NumericRange::new(self.min_percentage, self.max_percentage)
            .contains(quote.abs_percentage());
        let direction = match self.movement_type.as_deref() {
            None | Some("") => true,
            Some(wanted) => quote.movement() == wanted,
        };
        in_range && direction
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketMatches {
    pub filtered_markets: BTreeMap<String, Vec<MarketQuote>>,
}

impl RecordFilter for MovementFilter {
    type Payload = FinancePayload;
    type Output = MarketMatches;

    fn apply(&self, _id: &SearchId, payload: &FinancePayload) -> SearchResult<(MarketMatches, usize)> {
        let filtered_markets: BTreeMap<String, Vec<MarketQuote>> = payload
            .quote_regions()
            .map(|(region, quotes)| (region.clone(), retain(quotes, self)))
            .filter(|(_, quotes)| !quotes.is_empty())
            .collect();
        let total = filtered_markets.values().map(Vec::len).sum();
        Ok((MarketMatches { filtered_markets }, total))
    }
}

// Weather

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastConditionsFilter {
    #[serde(default)]
    pub min_temp: Option<f64>,
    #[serde(default)]
    pub max_temp: Option<f64>,
    #[serde(default)]
    pub max_precipitation_chance: Option<f64>,
    /// Highest acceptable wind speed, e.g. `"15 mph"`
    #[serde(default)]
    pub wind_speed_threshold: Option<String>,
}

impl ForecastConditionsFilter {
    fn wind_limit(&self) -> SearchResult<Option<f64>> {
        match self.wind_speed_threshold.as_deref() {
            None => Ok(None),
            Some(threshold) => highest_number(threshold).map(Some).ok_or_else(|| {
                SearchError::InvalidArguments(format!(
                    "wind_speed_threshold has no numeric speed: {}",
                    threshold
                ))
            }),
        }
    }

    fn admits(&self, period: &ForecastPeriod, wind_limit: Option<f64>) -> bool {
        let temperature = NumericRange::new(self.min_temp, self.max_temp).admits(period.temperature());
        let precipitation =
            NumericRange::new(None, self.max_precipitation_chance).admits(period.precipitation_chance());
        let wind = match (wind_limit, period.wind_speed.as_deref().and_then(highest_number)) {
            (Some(limit), Some(speed)) => speed <= limit,
            _ => true,
        };
        temperature && precipitation && wind
    }
}

impl Predicate<ForecastPeriod> for ForecastConditionsFilter {
    /// Matches with the wind check skipped when the threshold has no number.
    fn matches(&self, period: &ForecastPeriod) -> bool {
        self.admits(period, self.wind_limit().ok().flatten())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastMatches {
    pub original_periods: usize,
    pub periods: Vec<ForecastPeriod>,
}

impl RecordFilter for ForecastConditionsFilter {
    type Payload = WeatherPayload;
    type Output = ForecastMatches;

    fn apply(&self, id: &SearchId, payload: &WeatherPayload) -> SearchResult<(ForecastMatches, usize)> {
        if !payload.is_forecast() {
            return Err(SearchError::InvalidArguments(format!(
                "Data with ID {} is not forecast data",
                id
            )));
        }

        let wind_limit = self.wind_limit()?;
        let periods: Vec<ForecastPeriod> = payload
            .periods()
            .iter()
            .filter(|period| self.admits(period, wind_limit))
            .cloned()
            .collect();
        let total = periods.len();
        Ok((
            ForecastMatches {
                original_periods: payload.periods().len(),
                periods,
            },
            total,
        ))
    }
}

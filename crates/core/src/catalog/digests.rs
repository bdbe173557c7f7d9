use serde_json::Value;

use super::render::{lookup, lookup_text, or_na, param, title_case, truncate, value_text, Doc, NOT_AVAILABLE};
use crate::payload::{
    EventsPayload, FinancePayload, FlightOffer, FlightsPayload, GeocodePayload, HotelsPayload,
    Payload, WeatherPayload,
};
use crate::records::SearchMetadata;

const FLIGHT_OPTIONS_SHOWN: usize = 5;
const PROPERTIES_SHOWN: usize = 5;
const AMENITIES_SHOWN: usize = 5;
const EVENTS_SHOWN: usize = 10;
const QUOTES_SHOWN: usize = 5;
const PERIODS_SHOWN: usize = 14;
const ALERTS_SHOWN: usize = 10;
const PLACES_SHOWN: usize = 5;

/// Markdown renderings of a stored payload
pub trait Digest {
    /// Bullet fields for the namespace listing
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc);

    /// Sections of the bounded detail view
    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc);
}

impl Digest for Payload {
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        match self {
            Payload::Flights(p) => p.summary(metadata, doc),
            Payload::Hotels(p) => p.summary(metadata, doc),
            Payload::Events(p) => p.summary(metadata, doc),
            Payload::Finance(p) => p.summary(metadata, doc),
            Payload::Weather(p) => p.summary(metadata, doc),
            Payload::Geocode(p) => p.summary(metadata, doc),
        }
    }

    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        match self {
            Payload::Flights(p) => p.detail(metadata, doc),
            Payload::Hotels(p) => p.detail(metadata, doc),
            Payload::Events(p) => p.detail(metadata, doc),
            Payload::Finance(p) => p.detail(metadata, doc),
            Payload::Weather(p) => p.detail(metadata, doc),
            Payload::Geocode(p) => p.detail(metadata, doc),
        }
    }
}

fn count(value: Option<&Value>, key: &str) -> u64 {
    value.and_then(|v| v.get(key)).and_then(Value::as_u64).unwrap_or(0)
}

/// "2 adults, 1 children" from a passenger or guest object
fn party(value: Option<&Value>) -> String {
    let mut text = format!("{} adults", count(value, "adults"));
    for (key, label) in [
        ("children", "children"),
        ("infants_in_seat", "infants in seat"),
        ("infants_on_lap", "infants on lap"),
    ] {
        let n = count(value, key);
        if n > 0 {
            text.push_str(&format!(", {} {}", n, label));
        }
    }
    text
}

fn price_span(prices: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    prices.fold(None, |span, p| match span {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
    })
}

// Flights

impl Digest for FlightsPayload {
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        let return_date = metadata
            .text("return_date")
            .unwrap_or("One way")
            .to_string();
        doc.field(
            "Route",
            format!("{} → {}", param(metadata, "departure"), param(metadata, "arrival")),
        )
        .field("Dates", format!("{} - {}", param(metadata, "outbound_date"), return_date))
        .field("Passengers", party(metadata.get("passengers")))
        .field(
            "Options",
            format!("{} best, {} other", self.best_flights.len(), self.other_flights.len()),
        );
    }

    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        let currency = metadata.text("currency").unwrap_or("USD");

        let mut dates = param(metadata, "outbound_date");
        if let Some(return_date) = metadata.text("return_date") {
            dates.push_str(&format!(" - {}", return_date));
        }
        doc.heading(2, "Search Details")
            .field(
                "Route",
                format!("{} → {}", param(metadata, "departure"), param(metadata, "arrival")),
            )
            .field("Dates", dates)
            .field("Trip Type", param(metadata, "trip_type"))
            .field("Travel Class", param(metadata, "travel_class"))
            .field("Passengers", party(metadata.get("passengers")))
            .field("Currency", currency)
            .blank();

        if let Some(insights) = &self.price_insights {
            doc.heading(2, "Price Insights");
            if let Some(lowest) = &insights.lowest_price {
                doc.field("Lowest Price", format!("{} {}", lowest, currency));
            }
            if let Some(level) = &insights.price_level {
                doc.field("Price Level", level);
            }
            if let [low, high, ..] = insights.typical_price_range.as_slice() {
                doc.field("Typical Range", format!("{} - {} {}", low, high, currency));
            }
            doc.blank();
        }

        if !self.best_flights.is_empty() {
            doc.heading(2, format!("Best Flights ({})", self.best_flights.len()))
                .blank();
            for (i, offer) in self.best_flights.iter().take(FLIGHT_OPTIONS_SHOWN).enumerate() {
                render_offer(doc, i + 1, offer, currency);
            }
            doc.more(self.best_flights.len(), FLIGHT_OPTIONS_SHOWN, "best flights");
        }

        if !self.other_flights.is_empty() {
            doc.heading(2, "Other Flights")
                .line(format!("Total other options: {}", self.other_flights.len()));
            if let Some((lo, hi)) = price_span(self.other_flights.iter().map(FlightOffer::price_or_zero)) {
                doc.line(format!("Price range: {} - {} {}", lo, hi, currency));
            }
            doc.blank();
        }
    }
}

fn render_offer(doc: &mut Doc, number: usize, offer: &FlightOffer, currency: &str) {
    doc.heading(3, format!("Option {}", number))
        .field("Price", format!("{} {}", or_na(offer.price.as_ref()), currency))
        .field(
            "Total Duration",
            format!("{} minutes", or_na(offer.total_duration.as_ref())),
        )
        .field("Flights", offer.flights.len());
    if !offer.layovers.is_empty() {
        doc.field("Layovers", offer.layovers.len());
    }
    for (j, leg) in offer.flights.iter().enumerate() {
        let dep = leg.departure_airport.as_ref();
        let arr = leg.arrival_airport.as_ref();
        doc.line(format!(
            "  - **Flight {}**: {} → {}",
            j + 1,
            or_na(dep.and_then(|a| a.id.as_deref())),
            or_na(arr.and_then(|a| a.id.as_deref()))
        ))
        .line(format!("    - Departure: {}", or_na(dep.and_then(|a| a.time.as_deref()))))
        .line(format!("    - Arrival: {}", or_na(arr.and_then(|a| a.time.as_deref()))))
        .line(format!("    - Airline: {}", or_na(leg.airline.as_deref())))
        .line(format!("    - Flight Number: {}", or_na(leg.flight_number.as_deref())));
    }
    doc.blank();
}

// Hotels

impl Digest for HotelsPayload {
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        doc.field("Location", param(metadata, "location"))
            .field(
                "Dates",
                format!(
                    "{} - {}",
                    param(metadata, "check_in_date"),
                    param(metadata, "check_out_date")
                ),
            )
            .field("Guests", party(metadata.get("guests")))
            .field(
                "Type",
                title_case(metadata.search_type.as_deref().unwrap_or("hotels")),
            )
            .field("Properties Found", self.properties.len());
    }

    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        let currency = metadata.text("currency").unwrap_or("USD");
        doc.heading(2, "Search Details")
            .field("Location", param(metadata, "location"))
            .field("Check-in", param(metadata, "check_in_date"))
            .field("Check-out", param(metadata, "check_out_date"))
            .field("Guests", party(metadata.get("guests")))
            .field(
                "Search Type",
                title_case(metadata.search_type.as_deref().unwrap_or("hotels")),
            )
            .field("Currency", currency)
            .blank();

        if self.properties.is_empty() {
            doc.line("No properties found for this search.").blank();
            return;
        }

        doc.heading(2, format!("Properties Found ({})", self.properties.len()))
            .blank();
        if let Some((lo, hi)) = self.price_range() {
            doc.line(format!("**Price Range**: {} - {} {} per night", lo, hi, currency));
        }
        if let Some((lo, hi)) = price_span(self.properties.iter().filter_map(|p| p.rating())) {
            doc.line(format!("**Rating Range**: {:.1} - {:.1}", lo, hi));
        }
        doc.blank();

        for (i, property) in self.properties.iter().take(PROPERTIES_SHOWN).enumerate() {
            doc.heading(3, format!("{}. {}", i + 1, or_na(property.name.as_deref())))
                .field("Type", title_case(property.kind.as_deref().unwrap_or(NOT_AVAILABLE)));
            if let Some(class) = &property.hotel_class {
                doc.field("Class", class);
            }
            if let Some(rate) = &property.rate_per_night {
                let mut text = match (&rate.lowest, &rate.extracted_lowest) {
                    (Some(lowest), _) => lowest.clone(),
                    (None, Some(n)) => format!("{} {}", n, currency),
                    (None, None) => NOT_AVAILABLE.to_string(),
                };
                text.push_str(" per night");
                if let Some(before) = &rate.before_taxes_fees {
                    text.push_str(&format!(" ({} before taxes/fees)", before));
                }
                doc.field("Rate", text);
            }
            if let Some(rating) = property.rating() {
                let reviews = property
                    .reviews
                    .as_ref()
                    .map(|r| format!(" ({} reviews)", r))
                    .unwrap_or_default();
                doc.field("Rating", format!("{:.1}/5{}", rating, reviews));
            }
            if !property.amenities.is_empty() {
                let mut text = property
                    .amenities
                    .iter()
                    .take(AMENITIES_SHOWN)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                if property.amenities.len() > AMENITIES_SHOWN {
                    text.push_str(&format!(" +{} more", property.amenities.len() - AMENITIES_SHOWN));
                }
                doc.field("Amenities", text);
            }
            if let Some(deal) = &property.deal {
                doc.field("Deal", deal);
            }
            doc.blank();
        }
        doc.more(self.properties.len(), PROPERTIES_SHOWN, "properties");

        if !self.brands.is_empty() {
            doc.heading(2, format!("Available Brands ({})", self.brands.len()))
                .blank();
        }
    }
}

// Events

impl Digest for EventsPayload {
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        doc.field("Query", param(metadata, "query"))
            .field("Location", metadata.text("location").unwrap_or("Global"))
            .field("Date Filter", metadata.text("date_filter").unwrap_or("None"))
            .field("Event Type", metadata.text("event_type").unwrap_or("None"))
            .field("Total Results", self.events_results.len());
    }

    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        doc.heading(2, "Search Details")
            .field("Query", param(metadata, "query"))
            .field("Location", metadata.text("location").unwrap_or("Global"))
            .field("Date Filter", metadata.text("date_filter").unwrap_or("None"))
            .field("Event Type", metadata.text("event_type").unwrap_or("None"))
            .field("Language", param(metadata, "language"))
            .field("Country", param(metadata, "country"))
            .blank();

        if self.events_results.is_empty() {
            doc.line("No events found for this search.");
            return;
        }

        doc.heading(2, format!("Events Found ({})", self.events_results.len()))
            .blank();
        for (i, event) in self.events_results.iter().take(EVENTS_SHOWN).enumerate() {
            doc.heading(3, format!("{}. {}", i + 1, or_na(event.title.as_deref())))
                .field("When", or_na(event.when()));
            if !event.address.is_empty() {
                doc.field("Address", event.address.join(", "));
            }
            if let Some(venue) = event.venue_name() {
                doc.field("Venue", venue);
            }
            if let Some(description) = &event.description {
                doc.field("Description", truncate(description, 200));
            }
            doc.field("Event Link", or_na(event.link.as_deref())).blank();
        }
        doc.more(self.events_results.len(), EVENTS_SHOWN, "events");
    }
}

// Finance

impl Digest for FinancePayload {
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        let search_type = metadata.search_type.as_deref().unwrap_or("unknown");
        doc.field("Type", title_case(search_type));
        match search_type {
            "currency" => {
                doc.field(
                    "Pair",
                    format!(
                        "{} → {}",
                        param(metadata, "from_currency"),
                        param(metadata, "to_currency")
                    ),
                )
                .field("Amount", param(metadata, "amount"));
            }
            "market_overview" => {
                let regions: Vec<&str> = self.quote_regions().map(|(r, _)| r.as_str()).collect();
                doc.field("Regions", if regions.is_empty() { NOT_AVAILABLE.to_string() } else { regions.join(", ") });
            }
            _ => {
                doc.field("Symbol", param(metadata, "symbol"))
                    .field("Exchange", param(metadata, "exchange"));
                if metadata.get("window").is_some_and(|w| !w.is_null()) {
                    doc.field("Window", param(metadata, "window"));
                }
            }
        }
        if let Some(summary) = &self.summary {
            doc.field("Price", or_na(summary.price.as_ref().map(value_text)));
        }
    }

    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        let search_type = metadata.search_type.as_deref().unwrap_or("unknown");
        doc.heading(2, "Search Details")
            .field("Type", title_case(search_type));
        for key in ["symbol", "exchange", "from_currency", "to_currency", "amount", "window"] {
            if metadata.get(key).is_some_and(|v| !v.is_null()) {
                doc.field(&title_case(key), param(metadata, key));
            }
        }
        doc.blank();

        if let Some(summary) = &self.summary {
            doc.heading(2, "Summary")
                .field("Name", or_na(summary.title.as_deref()))
                .field("Exchange", or_na(summary.exchange.as_deref()))
                .field("Price", or_na(summary.price.as_ref().map(value_text)))
                .field("Currency", or_na(summary.currency.as_deref()));
            if let Some(movement) = &summary.price_movement {
                doc.field(
                    "Movement",
                    format!(
                        "{} {} ({}%)",
                        or_na(movement.movement.as_deref()),
                        or_na(movement.value.as_ref()),
                        or_na(movement.percentage.as_ref())
                    ),
                );
            }
            doc.blank();
        }

        for (region, quotes) in self.quote_regions() {
            doc.heading(2, format!("{} ({})", title_case(region), quotes.len()));
            for quote in quotes.iter().take(QUOTES_SHOWN) {
                doc.line(format!(
                    "- **{}**: {} ({} {}%)",
                    or_na(quote.name.as_deref().or(quote.stock.as_deref())),
                    or_na(quote.price.as_ref()),
                    quote.movement(),
                    quote.abs_percentage()
                ));
            }
            doc.blank().more(quotes.len(), QUOTES_SHOWN, "quotes");
        }

        let prices = self.graph_prices();
        if let Some((lo, hi)) = price_span(prices.iter().copied()) {
            doc.heading(2, "Price History")
                .field("Data Points", prices.len())
                .field("Low", lo)
                .field("High", hi)
                .blank();
        }
        if let Some(events) = &self.key_events {
            doc.field("Key Events", events.len());
        }
        if let Some(news) = &self.news_results {
            doc.field("News Articles", news.len());
        }
    }
}

// Weather

impl WeatherPayload {
    fn kind(&self, metadata: &SearchMetadata) -> String {
        if let Some(forecast_type) = &self.forecast_type {
            return format!("Forecast ({})", forecast_type);
        }
        if self.alerts.is_some() {
            return format!("Alerts ({} alerts)", self.alerts().len());
        }
        match metadata.search_type.as_deref() {
            Some("forecast") => format!("Forecast ({} days)", self.days("forecast").len()),
            Some("historical") => format!("Historical ({} days)", self.days("historical").len()),
            Some("location") => "Location Info".to_string(),
            Some("current") => "Current Conditions".to_string(),
            None if self.current.is_some() => "Current Conditions".to_string(),
            other => title_case(other.unwrap_or("unknown")),
        }
    }

    fn location_text(&self, metadata: &SearchMetadata) -> String {
        let location = self.location.as_ref();
        if let Some(name) = location.and_then(|l| l.get("name")).and_then(Value::as_str) {
            let country = lookup_text(location, &["country"]);
            return format!("{}, {}", name, country);
        }
        if location.and_then(|l| l.get("city")).is_some() {
            return format!(
                "{}, {}",
                lookup_text(location, &["city"]),
                lookup_text(location, &["state"])
            );
        }
        metadata
            .text("location_query")
            .or(metadata.text("area"))
            .unwrap_or(NOT_AVAILABLE)
            .to_string()
    }
}

impl Digest for WeatherPayload {
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        doc.field("Type", self.kind(metadata))
            .field("Location", self.location_text(metadata));
        if metadata.get("latitude").is_some() {
            doc.field(
                "Coordinates",
                format!("{}, {}", param(metadata, "latitude"), param(metadata, "longitude")),
            );
        }
    }

    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        doc.heading(2, "Search Details")
            .field("Type", self.kind(metadata))
            .field("Location", self.location_text(metadata))
            .blank();

        if self.periods.is_some() {
            let periods = self.periods();
            doc.heading(2, format!("Forecast Periods ({})", periods.len()))
                .blank();
            for period in periods.iter().take(PERIODS_SHOWN) {
                doc.heading(3, or_na(period.name.as_deref()))
                    .field(
                        "Temperature",
                        format!(
                            "{}°{}",
                            or_na(period.temperature.as_ref()),
                            period.temperature_unit.as_deref().unwrap_or("")
                        ),
                    )
                    .field(
                        "Precipitation",
                        format!("{}%", or_na(period.probability_of_precipitation.as_ref())),
                    )
                    .field(
                        "Wind",
                        format!(
                            "{} {}",
                            or_na(period.wind_speed.as_deref()),
                            period.wind_direction.as_deref().unwrap_or("")
                        )
                        .trim_end(),
                    )
                    .field("Forecast", or_na(period.short_forecast.as_deref()))
                    .blank();
            }
            doc.more(periods.len(), PERIODS_SHOWN, "periods");
        }

        if self.alerts.is_some() {
            let alerts = self.alerts();
            doc.heading(2, format!("Alerts ({})", alerts.len())).blank();
            if alerts.is_empty() {
                doc.line("No alerts in effect.").blank();
            }
            for alert in alerts.iter().take(ALERTS_SHOWN) {
                doc.heading(3, or_na(alert.event.as_deref()))
                    .field("Headline", or_na(alert.headline.as_deref()))
                    .field("Severity", or_na(alert.severity.as_deref()))
                    .field("Urgency", or_na(alert.urgency.as_deref()))
                    .field("Area", or_na(alert.area_desc.as_deref()))
                    .field("Expires", or_na(alert.expires.as_deref()))
                    .blank();
            }
            doc.more(alerts.len(), ALERTS_SHOWN, "alerts");
        }

        if let Some(current) = self.current.as_ref() {
            let current = Some(current);
            doc.heading(2, "Current Conditions")
                .field("Temperature", lookup_text(current, &["temperature"]))
                .field("Feels Like", lookup_text(current, &["feelslike"]))
                .field("Description", lookup_text(current, &["weather_descriptions"]))
                .field("Humidity", format!("{}%", lookup_text(current, &["humidity"])))
                .field(
                    "Wind",
                    format!(
                        "{} {}",
                        lookup_text(current, &["wind_speed"]),
                        lookup_text(current, &["wind_dir"])
                    ),
                )
                .field("Observation Time", lookup_text(current, &["observation_time"]))
                .blank();
        }

        for (key, title) in [("forecast", "Daily Forecast"), ("historical", "Historical Days")] {
            let days = self.days(key);
            if days.is_empty() {
                continue;
            }
            doc.heading(2, format!("{} ({})", title, days.len())).blank();
            for (date, day) in days.iter().take(PERIODS_SHOWN) {
                let day = Some(*day);
                doc.heading(3, date)
                    .field("Min", lookup_text(day, &["mintemp"]))
                    .field("Max", lookup_text(day, &["maxtemp"]))
                    .field("Average", lookup_text(day, &["avgtemp"]))
                    .field("Sun Hours", lookup_text(day, &["sunhour"]))
                    .blank();
            }
            doc.more(days.len(), PERIODS_SHOWN, "days");
        }

        if let Some(conditions) = self.extra.get("conditions") {
            doc.heading(2, "Observed Conditions")
                .field("Station", lookup_text(self.extra.get("station"), &["name"]))
                .field("Observed", lookup_text(self.extra.get("observation_time"), &[]))
                .field("Description", lookup_text(Some(conditions), &["text_description"]))
                .field("Temperature", measurement(conditions, "temperature"))
                .field("Humidity", measurement(conditions, "relative_humidity"))
                .field("Wind", measurement(conditions, "wind_speed"))
                .field("Pressure", measurement(conditions, "barometric_pressure"))
                .blank();
        }
    }
}

/// `value unit` of an observed quantity such as `{"value": 21.5, "unit": "degC"}`
fn measurement(conditions: &Value, key: &str) -> String {
    match lookup(conditions, &[key, "value"]) {
        Some(value) => format!(
            "{} {}",
            value_text(value),
            lookup(conditions, &[key, "unit"]).and_then(Value::as_str).unwrap_or("")
        )
        .trim_end()
        .to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

// Geocode

impl GeocodePayload {
    fn is_batch(&self, metadata: &SearchMetadata) -> bool {
        metadata.search_type.as_deref() == Some("batch")
    }

    fn extra_text(&self, key: &str) -> String {
        lookup_text(self.extra.get(key), &[])
    }
}

impl Digest for GeocodePayload {
    fn summary(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        if self.is_batch(metadata) {
            doc.field("Type", "Batch Geocoding")
                .field("Locations", self.extra_text("total_locations"))
                .field("Successful", self.extra_text("successful"))
                .field("Failed", self.extra_text("failed"));
            return;
        }

        if let Some(coordinates) = &self.coordinates {
            doc.field("Type", "Reverse Geocoding")
                .field(
                    "Coordinates",
                    format!("{}, {}", coordinates.latitude, coordinates.longitude),
                )
                .field("Address", or_na(self.address.as_deref()));
            return;
        }

        doc.field("Type", "Geocoding")
            .field(
                "Query",
                or_na(self.query.as_deref().or(metadata.text("location"))),
            );
        let places = self.places();
        match places.as_slice() {
            [place] => {
                doc.field("Coordinates", format!("{}, {}", place.latitude, place.longitude))
                    .field("Address", or_na(place.display_name.as_deref()));
            }
            _ => {
                doc.field("Results", places.len());
            }
        }
    }

    fn detail(&self, metadata: &SearchMetadata, doc: &mut Doc) {
        doc.heading(2, "Search Details");
        self.summary(metadata, doc);
        doc.blank();

        if self.is_batch(metadata) {
            let results = self
                .extra
                .get("results")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            doc.heading(2, format!("Results ({})", results.len())).blank();
            for (i, item) in results.iter().take(PLACES_SHOWN).enumerate() {
                let result = Some(item);
                doc.heading(3, format!("{}. {}", i + 1, lookup_text(result, &["query"])));
                match lookup(item, &["error"]) {
                    Some(error) => doc.field("Error", value_text(error)),
                    None => doc
                        .field("Address", lookup_text(result, &["location_data", "display_name"]))
                        .field("Location ID", lookup_text(result, &["location_id"])),
                };
                doc.blank();
            }
            doc.more(results.len(), PLACES_SHOWN, "results");
            return;
        }

        let places = self.places();
        if places.len() > 1 {
            doc.heading(2, format!("Locations ({})", places.len())).blank();
            for (i, place) in places.iter().take(PLACES_SHOWN).enumerate() {
                doc.heading(3, format!("{}. {}", i + 1, or_na(place.display_name.as_deref())))
                    .field("Coordinates", format!("{}, {}", place.latitude, place.longitude))
                    .blank();
            }
            doc.more(places.len(), PLACES_SHOWN, "locations");
        }

        let raw = self
            .raw_data
            .as_ref()
            .or_else(|| places.first().and_then(|p| p.raw_data.as_ref()));
        if let Some(raw) = raw {
            doc.heading(2, "Details")
                .field("Category", lookup_text(Some(raw), &["category"]))
                .field("Type", lookup_text(Some(raw), &["type"]))
                .field("Country", lookup_text(Some(raw), &["address", "country"]))
                .field("OSM ID", lookup_text(Some(raw), &["osm_id"]))
                .blank();
        }
    }
}

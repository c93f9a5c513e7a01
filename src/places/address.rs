use serde::{Deserialize, Serialize};

/// One entry of a geocoder's `address_components` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    fn has_type(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}

/// Address fields the app's address form needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub line1: String,
    pub locality: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
}

fn first_of<'a>(components: &'a [AddressComponent], kinds: &[&str]) -> Option<&'a AddressComponent> {
    kinds
        .iter()
        .find_map(|kind| components.iter().find(|c| c.has_type(kind)))
}

/// Maps geocoder components onto [`ParsedAddress`].
///
/// Missing parts come back empty; the address wizard's details step asks
/// the user to fill them in.
pub fn parse_address_components(components: &[AddressComponent]) -> ParsedAddress {
    let long = |kinds: &[&str]| first_of(components, kinds).map(|c| c.long_name.clone());

    let line1 = ["premise", "street_number", "route"]
        .iter()
        .filter_map(|kind| long(&[*kind]))
        .collect::<Vec<_>>()
        .join(", ");

    ParsedAddress {
        line1,
        locality: long(&["sublocality_level_1", "sublocality", "neighborhood"]),
        city: long(&["locality", "administrative_area_level_2"]).unwrap_or_default(),
        state: long(&["administrative_area_level_1"]).unwrap_or_default(),
        pincode: long(&["postal_code"]).unwrap_or_default(),
        country: long(&["country"]).unwrap_or_default(),
    }
}

//! Fixed descriptive records printed after the map in the booklet

use serde::{Deserialize, Serialize};

/// One city section of the booklet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionRecord {
    /// Heading, e.g. "Paris, France"
    pub city: String,
    /// Single paragraph of free text
    pub description: String,
    /// Name of the monument shown in the picture
    pub monument: String,
    /// Picture reference: `http(s)://`, `file://` or a base64 `data:` URL
    pub image: String,
}

/// The three city descriptions, in booklet order.
pub fn default_descriptions() -> Vec<DescriptionRecord> {
    vec![
        DescriptionRecord {
            city: "Paris, France".into(),
            description: "Paris, la capitale de la France, est célèbre pour ses monuments iconiques tels que la Tour Eiffel, le Louvre, et l'Arc de Triomphe. La ville est un centre culturel et artistique majeur.".into(),
            monument: "Tour Eiffel".into(),
            image: "https://upload.wikimedia.org/wikipedia/commons/a/a8/Eiffel_Tower_%28Paris%29.jpg".into(),
        },
        DescriptionRecord {
            city: "London, United Kingdom".into(),
            description: "Londres, capitale du Royaume-Uni, est connue pour ses sites emblématiques comme le Palais de Buckingham, le Big Ben et la Tamise. Un lieu où l'histoire et la modernité se rencontrent.".into(),
            monument: "Big Ben".into(),
            image: "https://upload.wikimedia.org/wikipedia/commons/c/c2/Big_Ben_2017.jpg".into(),
        },
        DescriptionRecord {
            city: "Beijing, China".into(),
            description: "Pékin, capitale de la Chine, regorge de trésors culturels comme la Cité interdite, le Temple du Ciel et la Grande Muraille. Un mélange fascinant de tradition et de modernité.".into(),
            monument: "Cité Interdite".into(),
            image: "https://upload.wikimedia.org/wikipedia/commons/e/e4/Forbidden_City_in_Beijing_-_view_from_the_Jingshan_Park.jpg".into(),
        },
    ]
}

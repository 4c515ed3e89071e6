use crate::catalog::base_id;

/// One-line quip for the reveal screen.
pub fn flavor(distance_km: f64) -> &'static str {
    if distance_km < 0.3 {
        "You could smell the zapiekanka from here."
    } else if distance_km < 1.5 {
        "Close enough for the tram bell."
    } else if distance_km < 5. {
        "GPS shrugged at you."
    } else {
        "Other side of the Vistula vibes."
    }
}

const FACTS: &[(i64, &[&str])] = &[
    (
        1,
        &[
            "Old Town was rebuilt from wartime rubble using 18th-century paintings as references.",
            "The square hosts the Mermaid of Warsaw statue, a symbol of the city.",
        ],
    ),
    (
        4,
        &[
            "The Palace of Culture and Science was a \"gift\" from the Soviet Union in 1955.",
            "At 237 metres, it is still the tallest building in Poland.",
        ],
    ),
    (
        6,
        &[
            "Copernicus Science Centre opened in 2010 and now welcomes more than one million visitors a year.",
            "Its rooftop garden offers one of the best Vistula River panoramas.",
        ],
    ),
    (
        8,
        &[
            "The Warsaw Uprising Museum opened on the 60th anniversary of the 1944 uprising.",
            "Its centrepiece is a 1940s bomber replica suspended through the main hall.",
        ],
    ),
    (
        9,
        &[
            "Wilanow Palace is often called the \"Polish Versailles\".",
            "It survived the partitions and both world wars almost untouched.",
        ],
    ),
    (
        14,
        &[
            "PGE Narodowy hosted the opening match of UEFA Euro 2012.",
            "Its retractable roof can close in about 20 minutes.",
        ],
    ),
    (
        31,
        &[
            "Norblin Factory has been reinvented as a cultural and gastronomic hub.",
            "Original machinery lines several museum-style corridors.",
        ],
    ),
];

/// Trivia for a landmark, shared by all variants of the same attraction. Empty when there is none.
pub fn facts_for(landmark_id: i64) -> &'static [&'static str] {
    let base = base_id(landmark_id);
    FACTS
        .iter()
        .find(|(id, _)| *id == base)
        .map(|(_, facts)| *facts)
        .unwrap_or(&[])
}

#[test]
fn flavor_buckets() {
    assert_eq!(flavor(0.), "You could smell the zapiekanka from here.");
    assert_eq!(flavor(0.3), "Close enough for the tram bell.");
    assert_eq!(flavor(4.99), "GPS shrugged at you.");
    assert_eq!(flavor(5.), "Other side of the Vistula vibes.");
}

#[test]
fn facts_follow_base_attraction() {
    assert_eq!(facts_for(400).len(), 2);
    assert_eq!(facts_for(409), facts_for(400));
    assert!(facts_for(200).is_empty());
}

use serde::Serialize;

/// `CodMovim` of a collection (receipt) row.
pub const COLLECTION_MOVEMENT: &str = "D";
/// `TipoMovim` of a collection row: receipt / collection.
pub const RECEIPT_MOVEMENT_TYPE: &str = "RR";
/// Cash account used when the settled debt carries none.
pub const DEFAULT_COLLECTION_ACCOUNT: &str = "1101";
/// `TIPO_BIEN` of vehicle (automotor) debts; plates live in `Dominio`.
pub const VEHICLE_CATEGORY: &str = "AUAU";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub description: &'static str,
    pub icon: &'static str,
}

pub const UNKNOWN_CATEGORY: Category = Category {
    description: "unknown",
    icon: "?",
};

const CATEGORIES: [(&str, Category); 8] = [
    (
        VEHICLE_CATEGORY,
        Category {
            description: "Automotor",
            icon: "🚗",
        },
    ),
    (
        "INMU",
        Category {
            description: "Inmobiliario",
            icon: "🏠",
        },
    ),
    (
        "COME",
        Category {
            description: "Comercio e Industria",
            icon: "🏪",
        },
    ),
    (
        "CEME",
        Category {
            description: "Cementerio",
            icon: "🕯",
        },
    ),
    (
        "AGUA",
        Category {
            description: "Servicio de Agua",
            icon: "💧",
        },
    ),
    (
        "OBRA",
        Category {
            description: "Contribución por Mejoras",
            icon: "🏗",
        },
    ),
    (
        "MULT",
        Category {
            description: "Multas",
            icon: "⚠",
        },
    ),
    (
        "PLAN",
        Category {
            description: "Plan de Pagos",
            icon: "📄",
        },
    ),
];

pub fn category_for(code: Option<&str>) -> Category {
    let Some(code) = code.map(str::trim) else {
        return UNKNOWN_CATEGORY;
    };

    CATEGORIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, category)| *category)
        .unwrap_or(UNKNOWN_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_case_insensitively() {
        assert_eq!(category_for(Some("AUAU")).description, "Automotor");
        assert_eq!(category_for(Some(" inmu ")).description, "Inmobiliario");
    }

    #[test]
    fn unknown_or_missing_codes_map_to_marker() {
        assert_eq!(category_for(Some("ZZZZ")), UNKNOWN_CATEGORY);
        assert_eq!(category_for(None), UNKNOWN_CATEGORY);
    }
}

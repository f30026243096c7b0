#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::common::{Language, Mode, PaginateOptions, Paginated, Platform, SortOrder};

    #[test]
    fn test_language_from_str() {
        assert_eq!("fr".parse::<Language>(), Ok(Language::Fr));
        assert_eq!("en".parse::<Language>(), Ok(Language::En));

        let err = "es".parse::<Language>().unwrap_err();
        assert_eq!(err.kind, "language");
        assert_eq!(err.value, "es");
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("test".parse::<Mode>(), Ok(Mode::Test));
        assert!("NABIId mode".parse::<Mode>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Language::default(), Language::Fr);
        assert_eq!(Mode::default(), Mode::Production);
        assert_eq!(Platform::default(), Platform::Application);
    }

    #[test]
    fn test_paginate_options_skip_unset_fields() {
        let options = PaginateOptions::default()
            .limit(15)
            .sort_by("email", SortOrder::Desc);

        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({ "limit": 15, "sortField": "email", "sortOrder": "DESC" })
        );
    }

    #[test]
    fn test_paginated_deserialize() {
        let page: Paginated<u32> = serde_json::from_value(json!({
            "data": [1, 2],
            "hasNextPage": false,
            "currentPage": 1,
            "totalPages": 1,
            "totalCount": 2,
            "currentLimit": 15,
            "search": null
        }))
        .unwrap();

        assert_eq!(page.data, vec![1, 2]);
        assert_eq!(page.additional_offset, 0);
    }
}

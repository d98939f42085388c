use garde::Validate;
use shelf_dal::{ListingParams, Order};

use crate::error::{ApiError, ApiResult};

/// Listing query, without `page` and `page_size` everything is listed
#[derive(Debug, Clone, Default, Validate, serde::Deserialize)]
pub struct Paging {
    #[garde(range(min = 1))]
    page: Option<u32>,
    #[garde(range(min = 1, max = 1000))]
    page_size: Option<u32>,
    #[garde(length(max = 255))]
    sort: Option<String>,
}

impl Paging {
    pub fn into_listing_params(self, default_page_size: u32) -> ApiResult<ListingParams> {
        let mut params = if self.page.is_none() && self.page_size.is_none() {
            ListingParams::default()
        } else {
            let page = self.page.unwrap_or(1);
            let page_size = self.page_size.unwrap_or(default_page_size);
            let offset = (page - 1) as i64 * page_size as i64;
            ListingParams::new(offset, page_size as i64)
        };

        if let Some(sort) = self.sort {
            params = params.with_order(parse_ordering(&sort)?);
        }
        Ok(params)
    }
}

fn parse_ordering(orderings: &str) -> ApiResult<Vec<Order>> {
    orderings
        .split(',')
        .map(|name| {
            let (field_name, descending) = match name.trim() {
                "" => return Err(ApiError::InvalidQuery("Empty ordering name".to_string())),
                name if name.len() > 100 => {
                    return Err(ApiError::InvalidQuery("Ordering name too long".to_string()));
                }
                name if name.starts_with('+') => (&name[1..], false),
                name if name.starts_with('-') => (&name[1..], true),
                name => (name, false),
            };

            let order = if descending {
                Order::Desc(field_name.to_string())
            } else {
                Order::Asc(field_name.to_string())
            };

            Ok(order)
        })
        .collect()
}

use std::fmt;

/// Utility macro generating the endpoint enum together with the path token of every variant,
/// so the two can never drift apart.
macro_rules! make_endpoints {
    ($($name:ident: $token:expr,)*) => {
        /// Logical operations of the backend API
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Endpoint {
            $($name,)*
        }

        impl Endpoint {
            /// Every endpoint, in declaration order
            pub const ALL: &'static [Endpoint] = &[$(Endpoint::$name,)*];

            /// Path segment (or query key, for `Category`) of the endpoint
            pub fn token(&self) -> &'static str {
                match self {
                    $(Endpoint::$name => $token,)*
                }
            }
        }

        /// Absolute paths of the endpoints as served by the backend
        pub mod paths {
            $(
                #[allow(dead_code, non_upper_case_globals)]
                pub const $name: &str = concat!("/", $token);
            )*
        }
    };
}

make_endpoints! {
    Categories: "categories",
    Category: "category",
    Images: "images",
    Menu: "menu",
    Order: "order",
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tokens() {
        assert_eq!(Endpoint::Categories.token(), "categories");
        assert_eq!(Endpoint::Category.token(), "category");
        assert_eq!(Endpoint::Images.token(), "images");
        assert_eq!(Endpoint::Menu.token(), "menu");
        assert_eq!(Endpoint::Order.token(), "order");
    }

    #[test]
    fn test_paths_match_tokens() {
        assert_eq!(paths::Menu, "/menu");
        assert_eq!(paths::Order, "/order");
        for endpoint in Endpoint::ALL {
            assert!(!endpoint.token().contains('/'));
        }
        assert_eq!(Endpoint::ALL.len(), 5);
    }
}

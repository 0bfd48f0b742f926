//! Declarative helpers for implementing [`Describe`](crate::Describe)

/// Implement `Describe` for leaf types
///
/// The type is snapshot by cloning, so it must be
/// `Clone + Debug + PartialEq + Send + Sync + 'static`.
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct OrderId(u64);
///
/// gwt_graph::describe_leaf!(OrderId);
/// ```
#[macro_export]
macro_rules! describe_leaf {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Describe for $ty {
                fn describe(&self) -> $crate::Shape<'_> {
                    $crate::Shape::Leaf($crate::LeafValue::new(::core::clone::Clone::clone(self)))
                }

                fn kind(&self) -> $crate::ShapeKind {
                    $crate::ShapeKind::Leaf
                }

                fn terminal_value(&self) -> ::core::option::Option<$crate::LeafValue> {
                    ::core::option::Option::Some($crate::LeafValue::new(
                        ::core::clone::Clone::clone(self),
                    ))
                }
            }
        )+
    };
}

/// Implement `Describe` for a struct from its public fields
///
/// Fields are listed in declaration order; a string literal after a field
/// attaches a format hint.
///
/// # Example
/// ```rust,ignore
/// struct Invoice {
///     amount: f64,
///     currency: String,
/// }
///
/// gwt_graph::describe_struct!(Invoice { amount: "0.00", currency });
/// ```
#[macro_export]
macro_rules! describe_struct {
    ($ty:ty { $($field:ident $(: $format:literal)?),* $(,)? }) => {
        impl $crate::Describe for $ty {
            fn describe(&self) -> $crate::Shape<'_> {
                $crate::Shape::Struct(::std::vec![
                    $(
                        $crate::Field::new(::core::stringify!($field), &self.$field)
                            $(.with_format($format))?
                    ),*
                ])
            }

            fn kind(&self) -> $crate::ShapeKind {
                $crate::ShapeKind::Struct
            }
        }
    };
}

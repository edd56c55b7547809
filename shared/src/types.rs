use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($inner);

        impl $name {
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifies an Entity for the whole lifetime of the local view.
    EntityId(i64)
);
id_type!(
    /// Identifies a Component type. Dispatch order follows this id.
    ComponentId(u32)
);
id_type!(
    /// Index of a field inside a component payload.
    FieldId(u32)
);
id_type!(
    /// Index of a command on a component.
    CommandIndex(u32)
);

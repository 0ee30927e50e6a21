//! Declarative call shapes.

/// Declares a named call type with typed parameter fields.
///
/// ```ignore
/// bus_call! {
///     /// Resolves a host name.
///     pub struct ResolveHostname {
///         target: Target::from_name("org.freedesktop.resolve1"),
///         method: "ResolveHostname",
///         inputs { ifindex: Int32 = 0, name: Str = String::new() },
///         outputs { addresses: TupleArray, canonical: Str },
///     }
/// }
///
/// let call = ResolveHostname::new(&client);
/// call.set(call.name, "example.org".into());
/// if call.call_sync() { ... }
/// ```
///
/// The generated struct derefs to `Call`. Inputs and outputs are declared in
/// the order listed, inputs first.
#[macro_export]
macro_rules! bus_call {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            target: $target:expr,
            method: $method:expr,
            inputs { $($in_name:ident : $in_ty:ty = $in_init:expr),* $(,)? },
            outputs { $($out_name:ident : $out_ty:ty),* $(,)? } $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            inner: $crate::Call,
            $(pub $in_name: $crate::Param<$in_ty, $crate::In>,)*
            $(pub $out_name: $crate::Param<$out_ty, $crate::Out>,)*
        }

        impl $name {
            /// Builds and registers the call with `client`.
            pub fn new(client: &$crate::Client) -> Self {
                let mut builder = client.call($target, $method);
                $(let $in_name = builder.input::<$in_ty>(stringify!($in_name), $in_init);)*
                $(let $out_name = builder.output::<$out_ty>(stringify!($out_name));)*
                Self {
                    inner: builder.build(),
                    $($in_name,)*
                    $($out_name,)*
                }
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::Call;

            fn deref(&self) -> &$crate::Call {
                &self.inner
            }
        }
    };
}

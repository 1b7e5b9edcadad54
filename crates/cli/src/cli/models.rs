use pl_providers::ModelRegistry;

/// Print the catalog, one model per line. Entries no registered adapter
/// can serve are marked so they are not mistaken for usable ids.
pub fn list(registry: &ModelRegistry) {
    for d in registry.descriptors() {
        let servable = if registry.is_servable(d) { " " } else { "!" };
        let streaming = if d.streaming { "stream" } else { "      " };
        println!("{servable} {:<52} {streaming}  {}", d.qualified_id(), d.name);
    }
    println!("\n! = no adapter registered for this model");
}

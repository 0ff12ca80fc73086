mod test_archive_container;
mod test_derivation;
mod test_expansion;
mod test_integrations;
mod test_pipeline;

mod helpers;
mod test_catalog;
mod test_lifecycle;
mod test_tasks;
mod test_workers;

mod shapefile_test;
